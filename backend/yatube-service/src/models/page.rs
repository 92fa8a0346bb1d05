use serde::{Deserialize, Serialize};

/// `?page=N` query parameter.
///
/// Kept as a raw string so that malformed values fall back to page 1
/// instead of failing extraction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<String>,
}

impl PageRequest {
    pub fn new(page: usize) -> Self {
        Self {
            page: Some(page.to_string()),
        }
    }

    /// 1-based page number; missing, non-numeric and non-positive values map to 1.
    pub fn number(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|n| *n > 0)
            .map(|n| n as usize)
            .unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub per_page: usize,
    pub total_items: i64,
    pub num_pages: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    /// Row offset of page `number` for `per_page` items per page.
    ///
    /// `None` when the offset does not fit a database row offset.
    pub fn offset(number: usize, per_page: usize) -> Option<i64> {
        number
            .saturating_sub(1)
            .checked_mul(per_page)
            .and_then(|offset| i64::try_from(offset).ok())
    }

    /// Number of pages needed for `total_items` rows; at least 1.
    pub fn page_count(total_items: i64, per_page: usize) -> usize {
        let total = usize::try_from(total_items).unwrap_or(0);
        if total == 0 {
            1
        } else {
            total.div_ceil(per_page.max(1))
        }
    }

    pub fn new(items: Vec<T>, number: usize, per_page: usize, total_items: i64) -> Self {
        let num_pages = Self::page_count(total_items, per_page);

        Self {
            items,
            number,
            per_page,
            total_items,
            num_pages,
            has_next: number < num_pages,
            has_previous: number > 1,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            per_page: self.per_page,
            total_items: self.total_items,
            num_pages: self.num_pages,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_number_parsing() {
        assert_eq!(PageRequest::default().number(), 1);
        assert_eq!(PageRequest::new(3).number(), 3);
        for raw in ["0", "-1", "abc", ""] {
            let req = PageRequest {
                page: Some(raw.to_string()),
            };
            assert_eq!(req.number(), 1, "page={:?}", raw);
        }
    }

    #[test]
    fn test_offsets() {
        assert_eq!(Page::<()>::offset(1, 10), Some(0));
        assert_eq!(Page::<()>::offset(2, 10), Some(10));
        assert_eq!(Page::<()>::offset(0, 10), Some(0));
        assert_eq!(Page::<()>::offset(i64::MAX as usize, 10), None);
        assert_eq!(Page::<()>::offset(usize::MAX, 1), None);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(Page::<()>::page_count(0, 10), 1);
        assert_eq!(Page::<()>::page_count(-3, 10), 1);
        assert_eq!(Page::<()>::page_count(10, 10), 1);
        assert_eq!(Page::<()>::page_count(11, 10), 2);
    }

    #[test]
    fn test_huge_page_number_is_kept() {
        let req = PageRequest {
            page: Some("9223372036854775807".to_string()),
        };
        assert_eq!(req.number(), 9223372036854775807);
    }

    #[test]
    fn test_page_flags() {
        let first = Page::new(vec![0; 10], 1, 10, 19);
        assert_eq!(first.num_pages, 2);
        assert!(first.has_next);
        assert!(!first.has_previous);

        let second = Page::new(vec![0; 9], 2, 10, 19);
        assert!(!second.has_next);
        assert!(second.has_previous);

        let beyond = Page::<i32>::new(vec![], 5, 10, 19);
        assert!(beyond.is_empty());
        assert!(!beyond.has_next);

        let empty = Page::<i32>::new(vec![], 1, 10, 0);
        assert_eq!(empty.num_pages, 1);
        assert!(!empty.has_next);
    }
}
