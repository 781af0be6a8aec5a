//! Approximate matching of item names to image groups.
//!
//! Authors name screenshots after the item they illustrate, but never quite
//! exactly: case differs, `/` becomes `_`, a word gets abbreviated. Matching
//! therefore works on a similarity score rather than equality.
//!
//! ## Score
//!
//! Both strings are [normalized](normalize) (lowercased, apostrophes
//! dropped, every other non-alphanumeric character turned into a space,
//! whitespace collapsed) and compared with a Ratcliff/Obershelp
//! sequence-alignment ratio: `2·M / (|a| + |b|)` where `M` is the number of
//! characters covered by recursively found longest common blocks. Identical
//! normalized strings score exactly `1.0`.
//!
//! A candidate is an [`AssetGroup`]; its score against an item is the best
//! score over the group's distinct labels.
//!
//! ## Assignment
//!
//! Assignment is global and greedy, not a per-item argmax. All
//! `(item, candidate)` pairs at or above the threshold are sorted by
//!
//! 1. score, descending
//! 2. candidate tie-break key (first raw filename), ascending
//! 3. item source order, ascending
//!
//! and claimed in that order; a pair is skipped when either side is already
//! taken. Two near-duplicate item names (`Setup DB`, `Setup DB v2`) therefore
//! cannot both grab the `Setup DB` screenshots: the better match wins it and
//! the other item falls through to its next-best candidate, if any.

use crate::assets::{AssetGroup, ImageAsset};
use crate::records::Item;
use serde::Serialize;
use std::cmp::Ordering;

/// Default acceptance threshold.
pub const DEFAULT_THRESHOLD: f64 = 0.70;

/// Normalize text for comparison.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c == '\'' || c == '\u{2019}' {
            continue;
        }
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(c.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// Sequence-alignment similarity of two already-normalized strings, in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

/// Characters covered by recursively found longest common blocks.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_block(&a[alo..ahi], &b[blo..bhi]);
        if k == 0 {
            continue;
        }
        matched += k;
        let (i, j) = (alo + i, blo + j);
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }

    matched
}

/// Longest common contiguous block `(start_a, start_b, len)`.
///
/// Among equally long blocks the one starting earliest in `a`, then in `b`,
/// wins.
fn longest_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb { prev[j] + 1 } else { 0 };
            let k = cur[j + 1];
            if k > best.2 {
                best = (i + 1 - k, j + 1 - k, k);
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    best
}

/// Something an item can be matched against.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    /// Raw labels; each is normalized before scoring.
    pub labels: Vec<String>,
    /// Equal scores are resolved in ascending order of this key.
    pub tie_break: String,
}

impl MatchCandidate {
    pub fn from_group(group: &AssetGroup) -> Self {
        Self {
            labels: group.labels().into_iter().map(String::from).collect(),
            tie_break: group.first_filename().to_string(),
        }
    }

    /// A single-label candidate whose tie-break key is the label itself.
    pub fn from_stem(stem: &str) -> Self {
        Self {
            labels: vec![stem.to_string()],
            tie_break: stem.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scored {
    /// Index into the candidate list.
    pub candidate: usize,
    /// Index into the candidate's labels of the label that scored best.
    pub label: usize,
    pub score: f64,
}

/// The matcher's verdict for one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    /// Index into the item list.
    pub item: usize,
    /// Claimed candidate and winning score.
    pub matched: Option<Scored>,
    /// Best-scoring candidate regardless of threshold or claims.
    pub best: Option<Scored>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchOutcome {
    /// One entry per item, in item order.
    pub assignments: Vec<Assignment>,
    /// Candidate indices no item claimed, ascending.
    pub unclaimed: Vec<usize>,
}

impl MatchOutcome {
    pub fn matched_count(&self) -> usize {
        self.assignments.iter().filter(|a| a.matched.is_some()).count()
    }

    pub fn unmatched(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter().filter(|a| a.matched.is_none())
    }
}

/// Assign candidates to items. Deterministic for identical inputs.
pub fn assign(items: &[Item], candidates: &[MatchCandidate], threshold: f64) -> MatchOutcome {
    let normalized_candidates: Vec<Vec<String>> = candidates
        .iter()
        .map(|c| c.labels.iter().map(|l| normalize(l)).collect())
        .collect();

    let mut best: Vec<Option<Scored>> = vec![None; items.len()];
    let mut pairs: Vec<(usize, usize, usize, f64)> = Vec::new();

    for (item_idx, item) in items.iter().enumerate() {
        let name = normalize(&item.name);
        for (cand_idx, labels) in normalized_candidates.iter().enumerate() {
            let (label_idx, score) = labels
                .iter()
                .map(|label| similarity(&name, label))
                .enumerate()
                .fold((0, 0.0_f64), |acc, (idx, score)| {
                    if score > acc.1 { (idx, score) } else { acc }
                });

            let better = match best[item_idx] {
                None => true,
                Some(current) => {
                    compare_pairs(
                        (item_idx, cand_idx, score),
                        (item_idx, current.candidate, current.score),
                        candidates,
                    ) == Ordering::Less
                }
            };
            if better {
                best[item_idx] = Some(Scored {
                    candidate: cand_idx,
                    label: label_idx,
                    score,
                });
            }

            if score >= threshold {
                pairs.push((item_idx, cand_idx, label_idx, score));
            }
        }
    }

    pairs.sort_by(|x, y| compare_pairs((x.0, x.1, x.3), (y.0, y.1, y.3), candidates));

    let mut item_taken: Vec<Option<Scored>> = vec![None; items.len()];
    let mut candidate_taken = vec![false; candidates.len()];
    for (item_idx, cand_idx, label_idx, score) in pairs {
        if item_taken[item_idx].is_some() || candidate_taken[cand_idx] {
            continue;
        }
        item_taken[item_idx] = Some(Scored {
            candidate: cand_idx,
            label: label_idx,
            score,
        });
        candidate_taken[cand_idx] = true;
    }

    let assignments = item_taken
        .into_iter()
        .zip(best)
        .enumerate()
        .map(|(item, (matched, best))| Assignment {
            item,
            matched,
            best,
        })
        .collect();

    let unclaimed = candidate_taken
        .iter()
        .enumerate()
        .filter(|(_, taken)| !**taken)
        .map(|(idx, _)| idx)
        .collect();

    MatchOutcome {
        assignments,
        unclaimed,
    }
}

/// Claim order: score desc, tie-break key asc, item order asc.
fn compare_pairs(
    (item_x, cand_x, score_x): (usize, usize, f64),
    (item_y, cand_y, score_y): (usize, usize, f64),
    candidates: &[MatchCandidate],
) -> Ordering {
    score_y
        .total_cmp(&score_x)
        .then_with(|| candidates[cand_x].tie_break.cmp(&candidates[cand_y].tie_break))
        .then_with(|| cand_x.cmp(&cand_y))
        .then_with(|| item_x.cmp(&item_y))
}

/// An item together with the images it was matched to.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub item: Item,
    /// Display-ordered images; empty when nothing matched.
    pub images: Vec<ImageAsset>,
    pub score: Option<f64>,
}

/// Join a match outcome back onto items and groups.
pub fn attach_images(items: &[Item], groups: &[AssetGroup], outcome: &MatchOutcome) -> Vec<MatchResult> {
    items
        .iter()
        .zip(&outcome.assignments)
        .map(|(item, assignment)| match assignment.matched {
            Some(Scored { candidate, score, .. }) => MatchResult {
                item: item.clone(),
                images: groups[candidate].assets.clone(),
                score: Some(score),
            },
            None => MatchResult {
                item: item.clone(),
                images: Vec::new(),
                score: None,
            },
        })
        .collect()
}
