//! HTML fragment rendering.
//!
//! Produces the markup that goes *inside* template regions. The surrounding
//! page (styles, scripts, navigation) belongs to the template and is never
//! generated here. All templates are maud `html!` macros, so item text is
//! escaped automatically; only the encoded image URIs are attribute values
//! built by hand, and those are base64 and cannot break out of the quotes.
//!
//! ## Slide Markup
//!
//! ```html
//! <section class="slide" data-section="accomplished" data-page="1">
//!   <header class="slide-header">
//!     <h2 class="slide-title">October Achievements</h2>
//!     <span class="page-indicator">1 / 3</span>
//!   </header>
//!   <ul class="item-list">
//!     <li class="item">
//!       <span class="item-name">Fix login bug</span>
//!       <span class="badge">Backend</span>
//!       <div class="item-gallery"><img src="data:..." alt="Fix login bug 1"></div>
//!     </li>
//!   </ul>
//! </section>
//! ```
//!
//! The page indicator only appears when a section spans several slides.

use crate::encode::InlineImage;
use crate::paginate::Page;
use crate::records::Item;
use maud::{Markup, html};

/// An item together with its encoded images, ready for rendering.
#[derive(Debug, Clone, Copy)]
pub struct SlideItem<'a> {
    pub item: &'a Item,
    pub images: &'a [InlineImage],
}

/// A team member and the photo shown for them.
#[derive(Debug, Clone)]
pub struct TeamMember<'a> {
    pub name: &'a str,
    pub photo: InlineImage,
}

/// Render every page of a section as consecutive slides.
pub fn render_section(section: &str, title: &str, pages: &[Page<'_, SlideItem<'_>>]) -> Markup {
    let total = pages.len();
    html! {
        @for page in pages {
            section.slide data-section=(section) data-page=(page.index + 1) {
                header.slide-header {
                    h2.slide-title { (title) }
                    @if total > 1 {
                        span.page-indicator { (page.index + 1) " / " (total) }
                    }
                }
                ul.item-list {
                    @for entry in page.items {
                        (render_item(entry))
                    }
                }
            }
        }
    }
}

fn render_item(entry: &SlideItem<'_>) -> Markup {
    let item = entry.item;
    html! {
        li.item {
            span.item-name { (item.name) }
            @if let Some(category) = &item.category {
                span.badge { (category) }
            }
            @if !entry.images.is_empty() {
                div.item-gallery {
                    @for (idx, image) in entry.images.iter().enumerate() {
                        img src=(image.data_uri()) alt={ (item.name) " " (idx + 1) } loading="lazy";
                    }
                }
            }
        }
    }
}

/// Render timeline records (`date -- content`) as a single slide.
pub fn render_timeline(title: &str, entries: &[Item]) -> Markup {
    html! {
        section.slide data-section="timeline" {
            header.slide-header {
                h2.slide-title { (title) }
            }
            ol.timeline {
                @for entry in entries {
                    li.timeline-entry {
                        span.timeline-date { (entry.name) }
                        @if let Some(content) = &entry.category {
                            span.timeline-content { (content) }
                        }
                    }
                }
            }
        }
    }
}

/// Render the team photo grid.
pub fn render_team(members: &[TeamMember<'_>]) -> Markup {
    html! {
        div.team-grid {
            @for member in members {
                figure.team-member {
                    img src=(member.photo.data_uri()) alt=(member.name);
                    figcaption { (member.name) }
                }
            }
        }
    }
}

/// CSS `url()` value for an inline image.
pub fn css_url(image: &InlineImage) -> String {
    format!("url(\"{}\")", image.data_uri())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{MediaType, encode, placeholder};
    use crate::paginate::{Capacity, paginate};

    fn item(name: &str, category: Option<&str>, idx: usize) -> Item {
        Item {
            name: name.to_string(),
            category: category.map(String::from),
            origin_index: idx,
        }
    }

    fn entries<'a>(items: &'a [Item], images: &'a [InlineImage]) -> Vec<SlideItem<'a>> {
        items
            .iter()
            .map(|item| SlideItem {
                item,
                images: if item.origin_index == 0 { images } else { &[] },
            })
            .collect()
    }

    #[test]
    fn section_renders_one_slide_per_page() {
        let items: Vec<Item> = (0..8).map(|i| item(&format!("Item {i}"), None, i)).collect();
        let slide_items = entries(&items, &[]);
        let pages = paginate(&slide_items, Capacity::try_from(6).unwrap());
        let html = render_section("planned", "November Plans", &pages).into_string();

        assert_eq!(html.matches("<section class=\"slide\"").count(), 2);
        assert!(html.contains("data-section=\"planned\""));
        assert!(html.contains("data-page=\"2\""));
        assert!(html.contains("2 / 2"));
        assert_eq!(html.matches("November Plans").count(), 2);
        assert_eq!(html.matches("<li class=\"item\">").count(), 8);
    }

    #[test]
    fn single_page_has_no_indicator() {
        let items = vec![item("Write docs", None, 0)];
        let slide_items = entries(&items, &[]);
        let pages = paginate(&slide_items, Capacity::default());
        let html = render_section("planned", "Plans", &pages).into_string();
        assert!(!html.contains("page-indicator"));
    }

    #[test]
    fn badge_only_when_category_present() {
        let items = vec![item("Fix login bug", Some("Backend"), 0), item("Write docs", None, 1)];
        let slide_items = entries(&items, &[]);
        let pages = paginate(&slide_items, Capacity::default());
        let html = render_section("accomplished", "Done", &pages).into_string();
        assert_eq!(html.matches("class=\"badge\"").count(), 1);
        assert!(html.contains("<span class=\"badge\">Backend</span>"));
    }

    #[test]
    fn images_render_inline_in_order() {
        let images = vec![encode(b"one", MediaType::Png), encode(b"two", MediaType::Svg)];
        let items = vec![item("Login page", None, 0)];
        let slide_items = entries(&items, &images);
        let pages = paginate(&slide_items, Capacity::default());
        let html = render_section("accomplished", "Done", &pages).into_string();

        let first = html.find(&images[0].data_uri()).unwrap();
        let second = html.find(&images[1].data_uri()).unwrap();
        assert!(first < second);
        assert!(html.contains("alt=\"Login page 2\""));
        assert!(!html.contains("src=\"images/"));
    }

    #[test]
    fn item_text_is_escaped() {
        let items = vec![item("<script>alert(1)</script>", Some("a&b"), 0)];
        let slide_items = entries(&items, &[]);
        let pages = paginate(&slide_items, Capacity::default());
        let html = render_section("planned", "Plans", &pages).into_string();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a&amp;b"));
    }

    #[test]
    fn no_pages_no_slides() {
        let html = render_section("planned", "Plans", &[]).into_string();
        assert!(html.is_empty());
    }

    #[test]
    fn timeline_lists_dates_and_content() {
        let entries = vec![
            item("Oct 2", Some("Kickoff"), 0),
            item("Oct 20", Some("Beta release"), 1),
            item("Nov 1", None, 2),
        ];
        let html = render_timeline("Timeline", &entries).into_string();
        assert_eq!(html.matches("<li class=\"timeline-entry\">").count(), 3);
        assert!(html.contains("<span class=\"timeline-date\">Oct 20</span>"));
        assert!(html.contains("<span class=\"timeline-content\">Beta release</span>"));
        assert_eq!(html.matches("timeline-content").count(), 2);
    }

    #[test]
    fn team_grid_renders_photos_and_names() {
        let members = vec![
            TeamMember {
                name: "Ana",
                photo: encode(b"ana", MediaType::Jpeg),
            },
            TeamMember {
                name: "Ben",
                photo: placeholder(),
            },
        ];
        let html = render_team(&members).into_string();
        assert_eq!(html.matches("<figure class=\"team-member\">").count(), 2);
        assert!(html.contains("<figcaption>Ben</figcaption>"));
        assert!(html.contains("data:image/svg+xml;base64,"));
        assert!(html.contains("alt=\"Ana\""));
    }

    #[test]
    fn css_url_wraps_data_uri() {
        let image = encode(b"hello", MediaType::Png);
        assert_eq!(css_url(&image), "url(\"data:image/png;base64,aGVsbG8=\")");
    }
}
