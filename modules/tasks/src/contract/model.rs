use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The persisted to-do record. Only the repository creates or mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tri-state completion filter; `All` contributes no predicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

/// Sortable columns. The variant is the only way a column name reaches SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Title => "title",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Normalized list request as seen by a repository: `page >= 1` and
/// `1 <= page_size <= max` already hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub page_size: u32,
    pub query: String,
    pub status: StatusFilter,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            query: String::new(),
            status: StatusFilter::All,
            sort_by: SortField::CreatedAt,
            sort_order: SortOrder::Desc,
        }
    }
}

impl ListQuery {
    /// Zero page/page_size fall back to the defaults, page_size is capped at `max_page_size`.
    /// The free-text query is kept verbatim.
    pub fn normalized(mut self, default_page_size: u32, max_page_size: u32) -> Self {
        if self.page == 0 {
            self.page = 1;
        }
        if self.page_size == 0 {
            self.page_size = default_page_size;
        }
        self.page_size = self.page_size.clamp(1, max_page_size.max(1));
        self
    }

    /// Rows skipped before the page window: `(page - 1) * page_size`.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

/// Pagination metadata echoed with every list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl Pagination {
    pub fn new(page: u32, page_size: u32, total_items: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_items.div_ceil(u64::from(page_size))
        };
        Self {
            page,
            page_size,
            total_items,
            total_pages,
            has_previous: page > 1,
            has_next: u64::from(page) < total_pages,
        }
    }
}

/// One page of tasks plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_example_from_docs() {
        let p = Pagination::new(3, 20, 45);
        assert_eq!(p.total_pages, 3);
        assert!(!p.has_next);
        assert!(p.has_previous);

        let first = Pagination::new(1, 20, 45);
        assert!(first.has_next);
        assert!(!first.has_previous);
    }

    #[test]
    fn pagination_matches_ceiling_division() {
        for total in [0u64, 1, 19, 20, 21, 99, 100, 101, 1000] {
            for size in [1u32, 7, 20, 100] {
                let p = Pagination::new(1, size, total);
                let expected = (total + u64::from(size) - 1) / u64::from(size);
                assert_eq!(p.total_pages, expected, "total={total} size={size}");
                assert_eq!(p.has_next, 1 < expected);
            }
        }
    }

    #[test]
    fn empty_set_has_no_pages() {
        let p = Pagination::new(1, 20, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next);
        assert!(!p.has_previous);
    }

    #[test]
    fn normalization_defaults_and_clamps() {
        let q = ListQuery {
            page: 0,
            page_size: 0,
            query: "  milk ".into(),
            ..ListQuery::default()
        }
        .normalized(20, 100);
        assert_eq!(q.page, 1);
        assert_eq!(q.page_size, 20);
        assert_eq!(q.query, "  milk ", "query whitespace is significant");

        let q = ListQuery {
            page_size: 150,
            ..ListQuery::default()
        }
        .normalized(20, 100);
        assert_eq!(q.page_size, 100);
    }

    #[test]
    fn offset_formula() {
        let q = ListQuery {
            page: 3,
            page_size: 20,
            ..ListQuery::default()
        };
        assert_eq!(q.offset(), 40);
        assert_eq!(ListQuery::default().offset(), 0);
    }

    #[test]
    fn sort_columns_come_from_allow_list() {
        assert_eq!(SortField::CreatedAt.column(), "created_at");
        assert_eq!(SortField::UpdatedAt.column(), "updated_at");
        assert_eq!(SortField::Title.column(), "title");
        assert_eq!(SortOrder::default().keyword(), "DESC");
    }
}
