use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub const MIN_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Range covering the `months` full calendar months before the month of `today`.
///
/// The current month is never included, so `months = 1` in March yields February.
pub fn last_full_months(today: NaiveDate, months: u32) -> Option<DateRange> {
    let first_of_current = today.with_day(1)?;
    let start = first_of_current.checked_sub_months(Months::new(months))?;
    let end = first_of_current.pred_opt()?;
    Some(DateRange { start, end })
}

/// Page selection. Pages start at 1.
#[derive(Debug, Clone, Copy, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page number, starting at 1
    #[validate(range(min = 1, message = "The page value should be an integer greater than 0"))]
    pub page: i64,

    /// Entries per page, between 20 and 100
    #[validate(range(
        min = 20,
        max = 100,
        message = "The page size value should be an integer between 20 and 100"
    ))]
    pub page_size: i64,
}

impl PageQuery {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }

    pub fn pagination(&self, total_count: u64) -> PaginationData {
        PaginationData {
            current_page: self.page,
            total_pages: total_pages(total_count, self.page_size),
            total_count,
        }
    }
}

fn total_pages(total_count: u64, page_size: i64) -> u64 {
    let page_size = page_size.max(1) as u64;
    total_count.div_ceil(page_size)
}

/// Position of a page inside the full result set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationData {
    pub current_page: i64,
    pub total_pages: u64,
    pub total_count: u64,
}

/// Outcome of a bulk delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeleteResult {
    pub deleted_count: u64,
}
