//! CSV export of IPO listings.
//!
//! Callers filter and sort with `engine::filter_and_sort` first; rows are
//! written in the order given.

use crate::error::ValidationError;
use crate::models::IpoRecord;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fmt::Write;

pub const HEADERS: [&str; 12] = [
    "Company Name",
    "Symbol",
    "Price Band",
    "Issue Type",
    "Issue Size",
    "Open Date",
    "Close Date",
    "Status",
    "IPO Price",
    "Listing Price",
    "Listing Gain",
    "Current Return",
];

/// en-IN locale date, e.g. 22/11/2023.
pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

const NOT_AVAILABLE: &str = "N/A";

pub fn to_csv(ipos: &[IpoRecord]) -> Result<String> {
    to_csv_with(ipos, DEFAULT_DATE_FORMAT)
}

/// Header line unquoted, then one fully quoted row per IPO, joined by `\n`.
pub fn to_csv_with(ipos: &[IpoRecord], date_format: &str) -> Result<String> {
    let mut out = HEADERS.join(",");
    let rows = write_rows(ipos, date_format)?;
    if !rows.is_empty() {
        out.push('\n');
        out.push_str(rows.trim_end_matches('\n'));
    }
    Ok(out)
}

fn write_rows(ipos: &[IpoRecord], date_format: &str) -> Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Always)
        .double_quote(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for record in ipos {
        wtr.write_record(row(record, date_format)?)
            .with_context(|| format!("write CSV row for IPO {}", record.ipo.id))?;
    }

    let bytes = wtr.into_inner().context("flush CSV writer")?;
    Ok(String::from_utf8(bytes)?)
}

fn row(record: &IpoRecord, date_format: &str) -> Result<[String; 12], ValidationError> {
    let ipo = &record.ipo;
    Ok([
        record.company.name.clone(),
        record.company.symbol.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        ipo.price_band.clone(),
        ipo.issue_type.clone(),
        ipo.issue_size.clone(),
        fmt_date(ipo.open_date, date_format)?,
        fmt_date(ipo.close_date, date_format)?,
        ipo.status.to_string(),
        fmt_decimal(ipo.ipo_price),
        fmt_decimal(ipo.listing_price),
        fmt_decimal(ipo.listing_gain),
        fmt_decimal(ipo.current_return),
    ])
}

/// `to_string()` on a bad pattern panics; `write!` reports it instead.
pub fn fmt_date(date: NaiveDate, date_format: &str) -> Result<String, ValidationError> {
    let mut out = String::new();
    write!(out, "{}", date.format(date_format))
        .map_err(|_| ValidationError::InvalidDateFormat(date_format.to_string()))?;
    Ok(out)
}

/// 140.0 → "140", 12.5 → "12.5", absent → "N/A".
pub fn fmt_decimal(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// `<prefix>-YYYY-MM-DD.csv`
pub fn export_file_name(prefix: &str, today: NaiveDate) -> String {
    format!("{}-{}.csv", prefix, today.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Company, Ipo, IpoStatus};

    const HEADER_LINE: &str = "Company Name,Symbol,Price Band,Issue Type,Issue Size,Open Date,Close Date,Status,IPO Price,Listing Price,Listing Gain,Current Return";

    fn record(name: &str, symbol: Option<&str>) -> IpoRecord {
        let open = NaiveDate::from_ymd_opt(2023, 11, 22).unwrap();
        IpoRecord {
            ipo: Ipo {
                id: 1,
                company_id: 1,
                price_band: "₹475 - ₹500".into(),
                open_date: open,
                close_date: NaiveDate::from_ymd_opt(2023, 11, 24).unwrap(),
                issue_size: "₹3,042.51 Cr".into(),
                issue_type: "Book Built Issue IPO".into(),
                listing_date: None,
                status: IpoStatus::Listed,
                ipo_price: Some(500.0),
                listing_price: Some(1200.0),
                listing_gain: Some(140.0),
                current_market_price: None,
                current_return: None,
                created_at: open.and_hms_opt(0, 0, 0).unwrap(),
            },
            company: Company {
                id: 1,
                name: name.into(),
                symbol: symbol.map(Into::into),
                logo: None,
            },
            documents: None,
        }
    }

    #[test]
    fn test_empty_is_header_only() {
        assert_eq!(to_csv(&[]).unwrap(), HEADER_LINE);
    }

    #[test]
    fn test_line_count() {
        let ipos = vec![
            record("Tata Technologies", Some("TATA")),
            record("Ola Electric", Some("OLA")),
        ];
        let csv = to_csv(&ipos).unwrap();
        assert_eq!(csv.lines().count(), ipos.len() + 1);
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn test_row_format() {
        let csv = to_csv(&[record("Tata Technologies", Some("TATA"))]).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(
            row,
            r#""Tata Technologies","TATA","₹475 - ₹500","Book Built Issue IPO","₹3,042.51 Cr","22/11/2023","24/11/2023","LISTED","500","1200","140","N/A""#
        );
    }

    #[test]
    fn test_quotes_are_doubled_and_missing_symbol() {
        let csv = to_csv(&[record("A\"B", None)]).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with(r#""A""B","N/A","#));
    }

    #[test]
    fn test_keeps_input_order() {
        let ipos = vec![record("Zeta", None), record("Alpha", None)];
        let csv = to_csv(&ipos).unwrap();
        let names: Vec<&str> = csv.lines().skip(1).map(|l| l.split(',').next().unwrap()).collect();
        assert_eq!(names, vec!["\"Zeta\"", "\"Alpha\""]);
    }

    #[test]
    fn test_custom_date_format() {
        let csv = to_csv_with(&[record("Tata", None)], "%Y-%m-%d").unwrap();
        assert!(csv.contains("\"2023-11-22\",\"2023-11-24\""));
    }

    #[test]
    fn test_csv_reader_roundtrip() {
        let csv = to_csv(&[record("Comma, Inc \"quoted\"", None)]).unwrap();
        let mut rdr = csv::ReaderBuilder::new().from_reader(csv.as_bytes());
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), HEADERS.to_vec());
        let rec = rdr.records().next().unwrap().unwrap();
        assert_eq!(&rec[0], "Comma, Inc \"quoted\"");
        assert_eq!(&rec[11], "N/A");
    }

    #[test]
    fn test_bad_date_format_is_rejected() {
        assert!(to_csv_with(&[record("Tata", None)], "%Q-%m").is_err());
        // time fields cannot be rendered from a date
        assert!(to_csv_with(&[record("Tata", None)], "%H:%M").is_err());
        let d = NaiveDate::from_ymd_opt(2023, 11, 22).unwrap();
        assert_eq!(fmt_date(d, "%d %b %Y").unwrap(), "22 Nov 2023");
    }

    #[test]
    fn test_fmt_decimal_and_file_name() {
        assert_eq!(fmt_decimal(Some(12.5)), "12.5");
        assert_eq!(fmt_decimal(Some(-3.0)), "-3");
        assert_eq!(fmt_decimal(None), "N/A");
        let d = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(export_file_name("ipos-export", d), "ipos-export-2024-01-05.csv");
    }
}
