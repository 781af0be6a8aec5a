//! # Slide Deck
//!
//! Assembles a self-contained HTML slide deck from plain-text item lists and
//! a folder of screenshots. The author never edits HTML: they keep one text
//! file per section and drop images into a folder, and the deck is rebuilt
//! from an existing template.
//!
//! # Architecture: Parse, Match, Render, Splice
//!
//! ```text
//! 1. Parse     *.txt        →  sections of items       (records)
//! 2. Scan      images/      →  ordered image groups    (assets, naming)
//! 3. Match     items×groups →  one group per item      (matching)
//! 4. Render    pages        →  HTML fragments          (paginate, encode, render)
//! 5. Splice    template     →  <Label>-KPI.html        (template)
//! ```
//!
//! Steps 1-3 are what `check` runs. Everything is recomputed on every run;
//! nothing is cached between runs and the only file written is the final
//! deck.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`records`] | Line-oriented item parser (`name -- category`) and section labels |
//! | [`naming`] | Image filename conventions: `NN_NN_label`, `label-NN` |
//! | [`assets`] | Image directory scan and grouping by numeric sequence |
//! | [`matching`] | Similarity scoring and greedy global item/image assignment |
//! | [`paginate`] | Fixed-capacity slide pagination |
//! | [`encode`] | Media types and base64 data URIs |
//! | [`render`] | Maud fragments for section slides, timeline and team grid |
//! | [`template`] | In-place region and slot replacement in the template |
//! | [`deck`] | The pipeline: source discovery, assembly, write, promote |
//! | [`config`] | `config.toml` loading, merging and validation |
//! | [`output`] | CLI report formatting |
//!
//! # Design Decisions
//!
//! ## Splicing Instead of Re-generating
//!
//! The template is hand-written HTML with its own styles and scripts. It is
//! never parsed into a tree: [`template`] finds marked regions and slots by
//! bounded search and rewrites only their interiors. A generated deck is
//! byte-identical to its template everywhere else, so it can be diffed,
//! reviewed, and promoted to be the next month's template.
//!
//! ## Global Matching
//!
//! Items and screenshots are named by hand and never quite agree. Each item
//! gets the image group with the best similarity score above a threshold,
//! but assignment is global: pairs are claimed best-first, so two items with
//! near-identical names can't both take the same screenshots.
//!
//! ## Everything Inline
//!
//! Images are embedded as data URIs. The output is one file that can be
//! mailed around or opened from a USB stick.

pub mod assets;
pub mod config;
pub mod deck;
pub mod encode;
pub mod matching;
pub mod naming;
pub mod output;
pub mod paginate;
pub mod records;
pub mod render;
pub mod template;

#[cfg(test)]
pub(crate) mod test_helpers;
