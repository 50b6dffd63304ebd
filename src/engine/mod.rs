//! Listing and analytics logic shared by every reader of the IPO table.
//!
//! `filter_and_sort` backs the public listing, the admin dashboard and the
//! CSV export; `compute_stats` backs the analytics view. Both are pure: they
//! borrow the caller's records and return freshly allocated results.

use crate::error::ValidationError;
use crate::models::{IpoRecord, IpoStatus};
use icu_collator::options::CollatorOptions;
use icu_collator::{Collator, CollatorBorrowed};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::warn;

// ── Criteria ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(IpoStatus),
}

impl StatusFilter {
    fn admits(&self, status: IpoStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(s) => *s == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "ALL" {
            return Ok(StatusFilter::All);
        }
        s.parse::<IpoStatus>()
            .map(StatusFilter::Only)
            .map_err(|_| ValidationError::InvalidStatusFilter(s.to_string()))
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.pad("ALL"),
            StatusFilter::Only(s) => fmt::Display::fmt(s, f),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    GainHigh,
    GainLow,
    Name,
}

impl FromStr for SortKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(SortKey::Newest),
            "oldest" => Ok(SortKey::Oldest),
            "gain-high" => Ok(SortKey::GainHigh),
            "gain-low" => Ok(SortKey::GainLow),
            "name" => Ok(SortKey::Name),
            other => Err(ValidationError::InvalidSortKey(other.to_string())),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
            SortKey::GainHigh => "gain-high",
            SortKey::GainLow => "gain-low",
            SortKey::Name => "name",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub status: StatusFilter,
    pub search: String,
    pub sort: SortKey,
}

// ── Filter + sort ─────────────────────────────────────────────────────────────

/// Status filter, then search, then a stable sort. The input is left as is.
pub fn filter_and_sort(ipos: &[IpoRecord], criteria: &FilterCriteria) -> Vec<IpoRecord> {
    let query = criteria.search.to_lowercase();

    let mut out: Vec<IpoRecord> = ipos
        .iter()
        .filter(|r| criteria.status.admits(r.ipo.status))
        .filter(|r| query.is_empty() || matches_search(r, &query))
        .cloned()
        .collect();

    // `sort_by` is stable, equal keys keep their input order.
    match criteria.sort {
        SortKey::Newest => out.sort_by(|a, b| b.ipo.open_date.cmp(&a.ipo.open_date)),
        SortKey::Oldest => out.sort_by(|a, b| a.ipo.open_date.cmp(&b.ipo.open_date)),
        SortKey::GainHigh => out.sort_by(|a, b| cmp_f64(gain_or_zero(b), gain_or_zero(a))),
        SortKey::GainLow => out.sort_by(|a, b| cmp_f64(gain_or_zero(a), gain_or_zero(b))),
        SortKey::Name => out.sort_by(|a, b| locale_cmp(&a.company.name, &b.company.name)),
    }

    out
}

/// `query` must already be lowercased.
fn matches_search(record: &IpoRecord, query: &str) -> bool {
    record.company.name.to_lowercase().contains(query)
        || record
            .company
            .symbol
            .as_deref()
            .is_some_and(|s| s.to_lowercase().contains(query))
        || record.ipo.price_band.to_lowercase().contains(query)
}

fn gain_or_zero(record: &IpoRecord) -> f64 {
    record.ipo.listing_gain.unwrap_or(0.0)
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

static COLLATOR: LazyLock<Option<CollatorBorrowed<'static>>> = LazyLock::new(|| {
    Collator::try_new(Default::default(), CollatorOptions::default())
        .inspect_err(|e| warn!("Root collator unavailable, falling back to case folding: {}", e))
        .ok()
});

/// Root-locale collation: accents and case are secondary to the base letter,
/// lowercase before uppercase on a case-only tie.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    match COLLATOR.as_ref() {
        Some(collator) => collator.compare(a, b),
        None => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

// ── Stats ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusCount {
    pub status: IpoStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    #[serde(rename = "totalIPOs")]
    pub total_ipos: usize,
    #[serde(rename = "upcomingIPOs")]
    pub upcoming_ipos: usize,
    #[serde(rename = "openIPOs")]
    pub open_ipos: usize,
    #[serde(rename = "closedIPOs")]
    pub closed_ipos: usize,
    #[serde(rename = "listedIPOs")]
    pub listed_ipos: usize,
    pub average_listing_gain: f64,
    pub total_issue_size: u64,
    pub status_breakdown: Vec<StatusCount>,
}

pub fn compute_stats(ipos: &[IpoRecord]) -> StatsSummary {
    let count = |status: IpoStatus| ipos.iter().filter(|r| r.ipo.status == status).count();

    let status_breakdown: Vec<StatusCount> = IpoStatus::ALL
        .iter()
        .map(|&status| StatusCount { status, count: count(status) })
        .collect();

    // Only listed IPOs with a known gain take part in the average.
    let gains: Vec<f64> = ipos
        .iter()
        .filter(|r| r.ipo.status == IpoStatus::Listed)
        .filter_map(|r| r.ipo.listing_gain)
        .collect();
    let average_listing_gain = if gains.is_empty() {
        0.0
    } else {
        gains.iter().sum::<f64>() / gains.len() as f64
    };

    let total_issue_size = ipos
        .iter()
        .map(|r| extract_numeric_magnitude(&r.ipo.issue_size))
        .fold(0u64, u64::saturating_add);

    StatsSummary {
        total_ipos: ipos.len(),
        upcoming_ipos: status_breakdown[0].count,
        open_ipos: status_breakdown[1].count,
        closed_ipos: status_breakdown[2].count,
        listed_ipos: status_breakdown[3].count,
        average_listing_gain,
        total_issue_size,
        status_breakdown,
    }
}

/// Reads every ASCII digit in a free-text issue size as one integer.
///
/// Lossy: units ("Cr", "Lakh"), the decimal point and separators are all
/// dropped, so "₹3,042.51 Cr" becomes 304251. Kept this way for output
/// compatibility with the figures the analytics view has always shown.
/// Strings without digits yield 0; overflow saturates.
pub fn extract_numeric_magnitude(issue_size: &str) -> u64 {
    issue_size
        .chars()
        .filter_map(|c| c.to_digit(10))
        .fold(0u64, |acc, d| acc.saturating_mul(10).saturating_add(d as u64))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Company, Ipo};
    use chrono::NaiveDate;

    fn record(
        id: i64,
        name: &str,
        symbol: Option<&str>,
        status: IpoStatus,
        gain: Option<f64>,
        open: (i32, u32, u32),
    ) -> IpoRecord {
        let open_date = NaiveDate::from_ymd_opt(open.0, open.1, open.2).unwrap();
        IpoRecord {
            ipo: Ipo {
                id,
                company_id: id,
                price_band: "₹100 - ₹150".into(),
                open_date,
                close_date: open_date + chrono::Duration::days(3),
                issue_size: "100 Cr".into(),
                issue_type: "Book Built Issue IPO".into(),
                listing_date: None,
                status,
                ipo_price: None,
                listing_price: None,
                listing_gain: gain,
                current_market_price: None,
                current_return: None,
                created_at: open_date.and_hms_opt(0, 0, 0).unwrap(),
            },
            company: Company {
                id,
                name: name.into(),
                symbol: symbol.map(Into::into),
                logo: None,
            },
            documents: None,
        }
    }

    fn tata_ola() -> Vec<IpoRecord> {
        vec![
            record(
                1,
                "Tata Technologies",
                Some("TATA"),
                IpoStatus::Listed,
                Some(140.0),
                (2023, 11, 22),
            ),
            record(2, "Ola Electric", Some("OLA"), IpoStatus::Upcoming, None, (2024, 1, 15)),
        ]
    }

    fn ids(records: &[IpoRecord]) -> Vec<i64> {
        records.iter().map(|r| r.ipo.id).collect()
    }

    fn mixed() -> Vec<IpoRecord> {
        vec![
            record(1, "Zomato", Some("ZOMATO"), IpoStatus::Listed, Some(53.0), (2021, 7, 14)),
            record(2, "bajaj Housing", None, IpoStatus::Listed, Some(114.0), (2024, 9, 9)),
            record(3, "Swiggy", Some("SWIGGY"), IpoStatus::Closed, None, (2024, 11, 6)),
            record(
                4,
                "Hyundai Motor",
                Some("HYUNDAI"),
                IpoStatus::Listed,
                Some(-1.3),
                (2024, 10, 15),
            ),
            record(5, "Ather Energy", Some("ATHER"), IpoStatus::Open, None, (2024, 9, 9)),
            record(6, "Apple Foods", None, IpoStatus::Upcoming, Some(0.0), (2025, 1, 2)),
        ]
    }

    #[test]
    fn test_status_filter_listed_only() {
        let ipos = tata_ola();
        let criteria = FilterCriteria {
            status: StatusFilter::Only(IpoStatus::Listed),
            ..Default::default()
        };
        let out = filter_and_sort(&ipos, &criteria);
        assert_eq!(ids(&out), vec![1]);
    }

    #[test]
    fn test_status_filter_every_result_matches() {
        let ipos = mixed();
        for status in IpoStatus::ALL {
            let criteria = FilterCriteria {
                status: StatusFilter::Only(status),
                ..Default::default()
            };
            let out = filter_and_sort(&ipos, &criteria);
            assert!(out.iter().all(|r| r.ipo.status == status));
        }
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let ipos = tata_ola();
        let criteria = FilterCriteria { search: "ola".into(), ..Default::default() };
        assert_eq!(ids(&filter_and_sort(&ipos, &criteria)), vec![2]);

        let criteria = FilterCriteria { search: "TECHNO".into(), ..Default::default() };
        assert_eq!(ids(&filter_and_sort(&ipos, &criteria)), vec![1]);
    }

    #[test]
    fn test_search_matches_symbol_and_price_band() {
        let mut ipos = mixed();
        ipos.push(record(
            7,
            "Bajaj Housing Finance",
            Some("BHFL"),
            IpoStatus::Listed,
            Some(114.3),
            (2024, 9, 9),
        ));

        // "bhfl" appears only in the symbol
        let by_symbol = FilterCriteria { search: "bhfl".into(), ..Default::default() };
        assert_eq!(ids(&filter_and_sort(&ipos, &by_symbol)), vec![7]);

        let by_band = FilterCriteria { search: "₹100".into(), ..Default::default() };
        assert_eq!(filter_and_sort(&ipos, &by_band).len(), ipos.len());
    }

    #[test]
    fn test_missing_symbol_never_matches_on_symbol() {
        let ipos = vec![record(1, "Bajaj Housing", None, IpoStatus::Listed, None, (2024, 9, 9))];
        let criteria = FilterCriteria { search: "bhfl".into(), ..Default::default() };
        assert!(filter_and_sort(&ipos, &criteria).is_empty());
    }

    #[test]
    fn test_filters_compose() {
        let ipos = mixed();
        let criteria = FilterCriteria {
            status: StatusFilter::Only(IpoStatus::Listed),
            search: "o".into(),
            sort: SortKey::GainHigh,
        };
        // Zomato (53), bajaj Housing (114), Hyundai Motor (-1.3)
        assert_eq!(ids(&filter_and_sort(&ipos, &criteria)), vec![2, 1, 4]);
    }

    #[test]
    fn test_sort_by_open_date() {
        let ipos = mixed();
        let newest = FilterCriteria { sort: SortKey::Newest, ..Default::default() };
        assert_eq!(ids(&filter_and_sort(&ipos, &newest)), vec![6, 3, 4, 2, 5, 1]);

        let oldest = FilterCriteria { sort: SortKey::Oldest, ..Default::default() };
        assert_eq!(ids(&filter_and_sort(&ipos, &oldest)), vec![1, 2, 5, 4, 3, 6]);
    }

    #[test]
    fn test_sort_by_gain_treats_absent_as_zero() {
        let ipos = mixed();
        let high = FilterCriteria { sort: SortKey::GainHigh, ..Default::default() };
        // 3, 5 and 6 all count as zero and keep input order
        assert_eq!(ids(&filter_and_sort(&ipos, &high)), vec![2, 1, 3, 5, 6, 4]);

        let low = FilterCriteria { sort: SortKey::GainLow, ..Default::default() };
        assert_eq!(ids(&filter_and_sort(&ipos, &low)), vec![4, 3, 5, 6, 1, 2]);
    }

    #[test]
    fn test_sort_by_name_ignores_case() {
        let ipos = mixed();
        let criteria = FilterCriteria { sort: SortKey::Name, ..Default::default() };
        assert_eq!(ids(&filter_and_sort(&ipos, &criteria)), vec![6, 5, 2, 4, 3, 1]);
    }

    #[test]
    fn test_name_sort_collates_accents_and_case() {
        assert_eq!(locale_cmp("Éclair", "Zomato"), Ordering::Less);
        assert_eq!(locale_cmp("Éclair", "Delhivery"), Ordering::Greater);
        assert_eq!(locale_cmp("apple", "Apple"), Ordering::Less);
        assert_eq!(locale_cmp("Same", "Same"), Ordering::Equal);

        let ipos = vec![
            record(1, "Zomato", None, IpoStatus::Listed, None, (2021, 7, 14)),
            record(2, "Éclair Foods", None, IpoStatus::Open, None, (2024, 1, 1)),
            record(3, "Apple Foods", None, IpoStatus::Open, None, (2024, 1, 1)),
            record(4, "apple foods", None, IpoStatus::Open, None, (2024, 1, 1)),
        ];
        let criteria = FilterCriteria { sort: SortKey::Name, ..Default::default() };
        assert_eq!(ids(&filter_and_sort(&ipos, &criteria)), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_sort_is_stable_on_equal_keys() {
        let ipos = vec![
            record(10, "Same", None, IpoStatus::Open, None, (2024, 1, 1)),
            record(11, "Same", None, IpoStatus::Open, None, (2024, 1, 1)),
            record(12, "Same", None, IpoStatus::Open, None, (2024, 1, 1)),
        ];
        let keys = [
            SortKey::Newest,
            SortKey::Oldest,
            SortKey::GainHigh,
            SortKey::GainLow,
            SortKey::Name,
        ];
        for sort in keys {
            let criteria = FilterCriteria { sort, ..Default::default() };
            assert_eq!(ids(&filter_and_sort(&ipos, &criteria)), vec![10, 11, 12]);
        }
    }

    #[test]
    fn test_input_is_not_mutated() {
        let ipos = mixed();
        let before = ipos.clone();
        let criteria = FilterCriteria { sort: SortKey::Name, ..Default::default() };
        let _ = filter_and_sort(&ipos, &criteria);
        assert_eq!(ipos, before);
    }

    #[test]
    fn test_empty_input() {
        assert!(filter_and_sort(&[], &FilterCriteria::default()).is_empty());
        let stats = compute_stats(&[]);
        assert_eq!(stats.total_ipos, 0);
        assert_eq!(stats.average_listing_gain, 0.0);
        assert_eq!(stats.total_issue_size, 0);
        assert_eq!(stats.status_breakdown.len(), 4);
    }

    #[test]
    fn test_stats_tata_ola() {
        let stats = compute_stats(&tata_ola());
        assert_eq!(stats.total_ipos, 2);
        assert_eq!(stats.upcoming_ipos, 1);
        assert_eq!(stats.listed_ipos, 1);
        assert_eq!(stats.open_ipos, 0);
        assert_eq!(stats.closed_ipos, 0);
        assert_eq!(stats.average_listing_gain, 140.0);
        assert_eq!(stats.total_issue_size, 200);
    }

    #[test]
    fn test_stats_counts_add_up() {
        let ipos = mixed();
        let stats = compute_stats(&ipos);
        let sum: usize = stats.status_breakdown.iter().map(|s| s.count).sum();
        assert_eq!(stats.total_ipos, ipos.len());
        assert_eq!(sum, ipos.len());
        assert_eq!(
            stats.upcoming_ipos + stats.open_ipos + stats.closed_ipos + stats.listed_ipos,
            ipos.len()
        );
        let order: Vec<IpoStatus> = stats.status_breakdown.iter().map(|s| s.status).collect();
        assert_eq!(order, IpoStatus::ALL.to_vec());
    }

    #[test]
    fn test_average_gain_ignores_non_listed() {
        // Apple Foods carries a 0.0 gain but is UPCOMING, so it is left out.
        let stats = compute_stats(&mixed());
        let expected = (53.0 + 114.0 - 1.3) / 3.0;
        assert!((stats.average_listing_gain - expected).abs() < 1e-9);
    }

    #[test]
    fn test_stats_json_keys() {
        let json = serde_json::to_value(compute_stats(&tata_ola())).unwrap();
        assert_eq!(json["totalIPOs"], 2);
        assert_eq!(json["listedIPOs"], 1);
        assert_eq!(json["statusBreakdown"][0]["status"], "UPCOMING");
        assert_eq!(json["averageListingGain"], 140.0);
    }

    #[test]
    fn test_extract_numeric_magnitude() {
        assert_eq!(extract_numeric_magnitude("₹3,042.51 Cr"), 304251);
        assert_eq!(extract_numeric_magnitude("100 Cr"), 100);
        assert_eq!(extract_numeric_magnitude("50 Lakh"), 50);
        assert_eq!(extract_numeric_magnitude("TBA"), 0);
        assert_eq!(extract_numeric_magnitude(""), 0);
        assert_eq!(extract_numeric_magnitude("99999999999999999999999"), u64::MAX);
    }

    #[test]
    fn test_criteria_parsing() {
        assert_eq!("ALL".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!(
            "OPEN".parse::<StatusFilter>().unwrap(),
            StatusFilter::Only(IpoStatus::Open)
        );
        assert!("open".parse::<StatusFilter>().is_err());
        assert_eq!("gain-high".parse::<SortKey>().unwrap(), SortKey::GainHigh);
        assert!("gain".parse::<SortKey>().is_err());
    }
}
