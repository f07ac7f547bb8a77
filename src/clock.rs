//! Registry snapshot date ("DataStanu") provider.

use chrono::{Local, NaiveDate};

/// Supplies the as-of date for registry queries.
pub trait DateProvider: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Current local date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDate;

impl DateProvider for SystemDate {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A pinned date, for reproducible lookups against a known snapshot.
#[derive(Debug, Clone, Copy)]
pub struct FixedDate(pub NaiveDate);

impl DateProvider for FixedDate {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
