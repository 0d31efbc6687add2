/// Paging, sorting and search helpers for list queries
///
/// Every list endpoint takes `page`, `page_size`, an optional search string
/// and a sort column chosen from a per-table whitelist. Values coming from the
/// query string are clamped here so the SQL layer can trust them.

use serde::{Deserialize, Serialize};

/// Default number of rows per page
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Upper bound on rows per page
pub const MAX_PAGE_SIZE: i64 = 100;

/// Requested page, already clamped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Clamps `page` to at least 1 and `page_size` to `1..=MAX_PAGE_SIZE`
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let total_pages = if total <= 0 {
            0
        } else {
            (total + request.page_size - 1) / request.page_size
        };

        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// A whitelisted sort column for one table
///
/// Implementations map each variant to a fixed column expression, which is
/// the only thing ever interpolated into `ORDER BY`.
pub trait SortField: Copy {
    fn column(&self) -> &'static str;

    /// Unique column used to keep paging stable between equal sort keys
    fn tie_breaker(&self) -> &'static str {
        "id"
    }
}

/// Builds an `ORDER BY` clause with a stable tie-breaker
pub fn order_by<F: SortField>(field: F, order: SortOrder) -> String {
    format!(
        "ORDER BY {} {}, {} {}",
        field.column(),
        order.as_sql(),
        field.tie_breaker(),
        order.as_sql()
    )
}

/// Turns user input into an `ILIKE` pattern, or `None` when blank
///
/// `%`, `_` and `\` are escaped so they match literally.
pub fn search_pattern(search: Option<&str>) -> Option<String> {
    let term = search?.trim();
    if term.is_empty() {
        return None;
    }

    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    Some(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    enum TestSort {
        Name,
    }

    impl SortField for TestSort {
        fn column(&self) -> &'static str {
            match self {
                TestSort::Name => "name",
            }
        }
    }

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(None, None), PageRequest { page: 1, page_size: 10 });
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, page_size: 1 });
        assert_eq!(PageRequest::new(Some(-3), Some(500)), PageRequest { page: 1, page_size: 100 });
        assert_eq!(PageRequest::new(Some(4), Some(25)).offset(), 75);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let request = PageRequest::new(Some(1), Some(10));
        assert_eq!(Page::<i32>::new(vec![], 0, request).total_pages, 0);
        assert_eq!(Page::<i32>::new(vec![], 10, request).total_pages, 1);
        assert_eq!(Page::<i32>::new(vec![], 11, request).total_pages, 2);
    }

    #[test]
    fn test_order_by() {
        assert_eq!(
            order_by(TestSort::Name, SortOrder::Asc),
            "ORDER BY name ASC, id ASC"
        );
        assert_eq!(SortOrder::default(), SortOrder::Desc);
    }

    #[test]
    fn test_search_pattern() {
        assert_eq!(search_pattern(None), None);
        assert_eq!(search_pattern(Some("   ")), None);
        assert_eq!(search_pattern(Some(" rice ")), Some("%rice%".to_string()));
        assert_eq!(search_pattern(Some("50%_off")), Some("%50\\%\\_off%".to_string()));
    }
}
