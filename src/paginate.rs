//! Splitting ordered items across fixed-capacity slides.

use std::num::NonZeroUsize;
use thiserror::Error;

/// Default number of items per slide.
pub const DEFAULT_CAPACITY: usize = 6;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("items per slide must be at least 1, got {0}")]
pub struct CapacityConfigError(pub i64);

/// Validated page capacity. Constructing one is the only way a capacity
/// of zero or less can be rejected, so pagination itself cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity(NonZeroUsize);

impl Capacity {
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Self(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}

impl TryFrom<i64> for Capacity {
    type Error = CapacityConfigError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Capacity)
            .ok_or(CapacityConfigError(value))
    }
}

/// One slide's worth of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a, T> {
    /// 0-based page number.
    pub index: usize,
    pub items: &'a [T],
}

/// Split `items` into `ceil(len / capacity)` contiguous pages.
///
/// Order is preserved; the last page holds the remainder. No items, no pages.
pub fn paginate<T>(items: &[T], capacity: Capacity) -> Vec<Page<'_, T>> {
    items
        .chunks(capacity.get())
        .enumerate()
        .map(|(index, items)| Page { index, items })
        .collect()
}

/// Number of pages `paginate` would produce.
pub fn page_count(len: usize, capacity: Capacity) -> usize {
    len.div_ceil(capacity.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(n: i64) -> Capacity {
        Capacity::try_from(n).unwrap()
    }

    fn sizes<T>(pages: &[Page<'_, T>]) -> Vec<usize> {
        pages.iter().map(|p| p.items.len()).collect()
    }

    #[test]
    fn thirteen_items_by_six() {
        let items: Vec<u32> = (0..13).collect();
        let pages = paginate(&items, cap(6));
        assert_eq!(sizes(&pages), vec![6, 6, 1]);
        assert_eq!(page_count(13, cap(6)), 3);
    }

    #[test]
    fn two_items_fit_one_page() {
        let pages = paginate(&["a", "b"], Capacity::default());
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].items, &["a", "b"]);
    }

    #[test]
    fn empty_input_yields_no_pages() {
        let items: Vec<u32> = Vec::new();
        assert!(paginate(&items, cap(6)).is_empty());
        assert_eq!(page_count(0, cap(6)), 0);
    }

    #[test]
    fn exact_multiple_has_full_last_page() {
        let items: Vec<u32> = (0..12).collect();
        assert_eq!(sizes(&paginate(&items, cap(6))), vec![6, 6]);
    }

    #[test]
    fn concatenated_pages_reproduce_input() {
        for n in 0..20u32 {
            for c in 1..8 {
                let items: Vec<u32> = (0..n).collect();
                let pages = paginate(&items, cap(c));
                let flat: Vec<u32> = pages.iter().flat_map(|p| p.items.iter().copied()).collect();
                assert_eq!(flat, items, "n={n} c={c}");
                assert_eq!(pages.len(), page_count(n as usize, cap(c)));
                for (i, page) in pages.iter().enumerate() {
                    assert_eq!(page.index, i);
                    if i + 1 < pages.len() {
                        assert_eq!(page.items.len(), c as usize);
                    } else {
                        assert!((1..=c as usize).contains(&page.items.len()));
                    }
                }
            }
        }
    }

    #[test]
    fn capacity_of_one() {
        let pages = paginate(&[1, 2, 3], cap(1));
        assert_eq!(sizes(&pages), vec![1, 1, 1]);
    }

    #[test]
    fn zero_or_negative_capacity_rejected() {
        assert_eq!(Capacity::try_from(0), Err(CapacityConfigError(0)));
        assert_eq!(Capacity::try_from(-3), Err(CapacityConfigError(-3)));
    }

    #[test]
    fn default_capacity_is_six() {
        assert_eq!(Capacity::default().get(), 6);
    }
}
