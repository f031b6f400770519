//! Common types used across the platform

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{add_days, days_between};

/// Rows per page in table and card listings
pub const DEFAULT_PAGE_SIZE: u32 = 15;

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl PaginationMeta {
    /// Compute page count and clamp the requested page into range.
    ///
    /// An empty listing still has one (empty) page.
    pub fn new(requested: Pagination, total_items: u64) -> Self {
        let per_page = requested.per_page.max(1);
        let pages = total_items.div_ceil(u64::from(per_page)).max(1);
        let total_pages = u32::try_from(pages).unwrap_or(u32::MAX);
        Self {
            page: requested.page.clamp(1, total_pages),
            per_page,
            total_items,
            total_pages,
        }
    }

    /// Index range of the current page within the full listing
    pub fn bounds(&self) -> std::ops::Range<usize> {
        let start = (self.page as usize - 1) * self.per_page as usize;
        let end = (start + self.per_page as usize).min(self.total_items as usize);
        start.min(end)..end
    }
}

/// Sort direction for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of days in the range, counting both ends
    pub fn len_days(&self) -> i64 {
        days_between(self.start, self.end) + 1
    }

    /// Every day in the range, in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.len_days().max(0)).map(move |offset| add_days(self.start, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(Pagination { page: 2, per_page: 15 }, 31);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(meta.bounds(), 15..30);

        let last = PaginationMeta::new(Pagination { page: 9, per_page: 15 }, 31);
        assert_eq!(last.page, 3);
        assert_eq!(last.bounds(), 30..31);
    }

    #[test]
    fn test_empty_listing_has_one_page() {
        let meta = PaginationMeta::new(Pagination::default(), 0);
        assert_eq!(meta.total_pages, 1);
        assert_eq!(meta.page, 1);
        assert_eq!(meta.bounds(), 0..0);
    }

    #[test]
    fn test_date_range_days() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 2, 27).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        );
        assert_eq!(range.len_days(), 4);
        assert_eq!(range.days().count(), 4);
        assert_eq!(
            range.days().nth(2),
            Some(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
    }
}
