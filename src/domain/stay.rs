//! Half-open date ranges for stays
//!
//! A stay occupies the nights `[start, end)`: the guest checks in on
//! `start` and checks out on `end`, so a stay ending on a given day never
//! collides with one starting that same day.

use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::shared::errors::{DomainError, DomainResult};

/// A validated `[start, end)` date range with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StayRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl StayRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> DomainResult<Self> {
        if start >= end {
            return Err(DomainError::InvalidRange(format!(
                "check-in {} must be before check-out {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` dates into a range.
    pub fn parse(start: &str, end: &str) -> DomainResult<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| DomainError::InvalidRange(format!("invalid date '{}': {}", s, e)))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Half-open overlap: touching ranges do not overlap.
    pub fn overlaps(&self, other: &StayRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether the night starting on `date` falls inside the stay.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// The part of this range inside `window`, if any.
    pub fn clip(&self, window: &StayRange) -> Option<StayRange> {
        let start = self.start.max(window.start);
        let end = self.end.min(window.end);
        (start < end).then_some(StayRange { start, end })
    }

    /// Every occupied night, in order.
    pub fn iter_nights(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.nights() as u64).filter_map(move |n| self.start.checked_add_days(Days::new(n)))
    }
}

impl fmt::Display for StayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: &str, end: &str) -> StayRange {
        StayRange::parse(start, end).unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted_ranges() {
        assert!(matches!(
            StayRange::parse("2024-01-05", "2024-01-05"),
            Err(DomainError::InvalidRange(_))
        ));
        assert!(matches!(
            StayRange::parse("2024-01-06", "2024-01-05"),
            Err(DomainError::InvalidRange(_))
        ));
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(matches!(
            StayRange::parse("2024-13-01", "2024-01-05"),
            Err(DomainError::InvalidRange(_))
        ));
    }

    #[test]
    fn adjacent_ranges_do_not_overlap() {
        let first = range("2024-01-01", "2024-01-05");
        let second = range("2024-01-05", "2024-01-10");
        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));
    }

    #[test]
    fn partial_and_nested_ranges_overlap() {
        let booked = range("2024-01-01", "2024-01-05");
        assert!(booked.overlaps(&range("2024-01-03", "2024-01-06")));
        assert!(booked.overlaps(&range("2023-12-28", "2024-01-02")));
        assert!(booked.overlaps(&range("2024-01-02", "2024-01-03")));
        assert!(range("2023-12-01", "2024-02-01").overlaps(&booked));
    }

    #[test]
    fn nights_and_membership() {
        let stay = range("2024-01-01", "2024-01-05");
        assert_eq!(stay.nights(), 4);
        assert!(stay.contains(NaiveDate::from_ymd_opt(2024, 1, 4).unwrap()));
        assert!(!stay.contains(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()));
        let nights: Vec<_> = stay.iter_nights().collect();
        assert_eq!(nights.len(), 4);
        assert_eq!(nights[0], stay.start());
    }

    #[test]
    fn clip_to_window() {
        let stay = range("2024-01-01", "2024-01-10");
        let window = range("2024-01-05", "2024-02-01");
        assert_eq!(stay.clip(&window), Some(range("2024-01-05", "2024-01-10")));
        assert_eq!(stay.clip(&range("2024-01-10", "2024-01-12")), None);
    }
}
