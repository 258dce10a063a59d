use serde::{Deserialize, Serialize};

pub const PAGE_SIZE: i64 = 6;
const MAX_PAGE_SIZE: i64 = 100;

/// Page-number pagination, `?page=2&limit=10`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    PAGE_SIZE
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    /// Saturates for absurd page numbers; such a page is simply empty.
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: i64, params: PageParams) -> Self {
        let page = params.page();
        let has_next = page.saturating_mul(params.limit()) < count;
        Self {
            count,
            next: has_next.then_some(page + 1),
            previous: (page > 1).then_some(page - 1),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_follows_page_and_limit() {
        let p = PageParams { page: 3, limit: 10 };
        assert_eq!(p.offset(), 20);
        assert_eq!(PageParams::default().offset(), 0);
        assert_eq!(PageParams::default().limit(), PAGE_SIZE);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let p = PageParams { page: 0, limit: 1000 };
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), 100);
        assert_eq!(p.offset(), 0);
        assert_eq!(PageParams { page: 1, limit: -5 }.limit(), 1);
    }

    #[test]
    fn next_and_previous_links() {
        let first = Page::new(vec![1, 2], 5, PageParams { page: 1, limit: 2 });
        assert_eq!(first.next, Some(2));
        assert_eq!(first.previous, None);

        let last = Page::new(vec![5], 5, PageParams { page: 3, limit: 2 });
        assert_eq!(last.next, None);
        assert_eq!(last.previous, Some(2));
    }

    #[test]
    fn huge_page_number_does_not_overflow() {
        let p = PageParams {
            page: i64::MAX,
            limit: 6,
        };
        assert_eq!(p.offset(), i64::MAX);

        let page = Page::<i32>::new(vec![], 10, p);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(i64::MAX - 1));
        assert!(page.results.is_empty());
    }
}
