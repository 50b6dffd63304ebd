//! Admin form coercion: text fields in, typed `NewIpo` / `IpoPatch` out.
//!
//! Anything malformed is rejected here so that stored rows are always valid.

use crate::error::ValidationError;
use crate::models::{
    check_date_window, check_single_line, IpoPatch, IpoStatus, NewIpo, RawIpoForm,
};
use chrono::NaiveDate;
use tracing::debug;

// ── Parsers ───────────────────────────────────────────────────────────────────

/// Parse a decimal. Only a leading currency sign, thousands commas and a
/// trailing `%` are dropped; the rest must be a plain `f64` literal.
/// "₹1,200.50" → 1200.5 | "140%" → 140.0 | "1e5" → 100000.0
pub fn parse_decimal(field: &'static str, s: &str) -> Result<f64, ValidationError> {
    let t = s.trim();
    let t = t.strip_suffix('%').unwrap_or(t).trim_end();
    let t = t.strip_prefix(['₹', '$']).unwrap_or(t).trim_start();
    let cleaned = t.replace(',', "");
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::InvalidNumber { field, value: s.to_string() })
}

pub fn parse_id(field: &'static str, s: &str) -> Result<i64, ValidationError> {
    s.trim()
        .parse()
        .map_err(|_| ValidationError::InvalidNumber { field, value: s.to_string() })
}

/// Dates: ISO, "22/11/2023", "Nov 22, 2023" or "22 Nov 2023".
pub fn parse_date(field: &'static str, s: &str) -> Result<NaiveDate, ValidationError> {
    let t = s.trim();
    ["%Y-%m-%d", "%d/%m/%Y", "%b %d, %Y", "%d %b %Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(t, fmt).ok())
        .ok_or_else(|| ValidationError::InvalidDate { field, value: s.to_string() })
}

/// Blank input means "not provided".
fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn required<'a>(field: &'static str, s: Option<&'a str>) -> Result<&'a str, ValidationError> {
    non_blank(s).ok_or(ValidationError::MissingField(field))
}

/// Required free text that must fit on one line.
fn text(field: &'static str, s: Option<&str>) -> Result<String, ValidationError> {
    let v = required(field, s)?;
    check_single_line(field, v)?;
    Ok(v.to_string())
}

fn optional<T>(
    field: &'static str,
    s: Option<&str>,
    parse: fn(&'static str, &str) -> Result<T, ValidationError>,
) -> Result<Option<T>, ValidationError> {
    non_blank(s).map(|v| parse(field, v)).transpose()
}

// ── Create form → NewIpo ──────────────────────────────────────────────────────

pub fn parse_ipo_form(form: &RawIpoForm) -> Result<NewIpo, ValidationError> {
    let company_id = parse_id("companyId", required("companyId", form.company_id.as_deref())?)?;
    let price_band = text("priceBand", form.price_band.as_deref())?;
    let open_date = parse_date("openDate", required("openDate", form.open_date.as_deref())?)?;
    let close_date = parse_date("closeDate", required("closeDate", form.close_date.as_deref())?)?;
    let issue_size = text("issueSize", form.issue_size.as_deref())?;
    let issue_type = text("issueType", form.issue_type.as_deref())?;
    let status: IpoStatus = required("status", form.status.as_deref())?.parse()?;

    check_date_window(open_date, close_date)?;

    Ok(NewIpo {
        company_id,
        price_band,
        open_date,
        close_date,
        issue_size,
        issue_type,
        listing_date: optional("listingDate", form.listing_date.as_deref(), parse_date)?,
        status,
        ipo_price: optional("ipoPrice", form.ipo_price.as_deref(), parse_decimal)?,
        listing_price: optional("listingPrice", form.listing_price.as_deref(), parse_decimal)?,
        listing_gain: optional("listingGain", form.listing_gain.as_deref(), parse_decimal)?,
        current_market_price: optional(
            "currentMarketPrice",
            form.current_market_price.as_deref(),
            parse_decimal,
        )?,
        current_return: optional("currentReturn", form.current_return.as_deref(), parse_decimal)?,
    })
}

// ── Edit form → IpoPatch ──────────────────────────────────────────────────────

/// Split "key=value". Only the first '=' separates, values may contain more.
pub fn split_assignment(s: &str) -> Result<(&str, &str), ValidationError> {
    s.split_once('=')
        .map(|(k, v)| (k.trim(), v))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| ValidationError::MalformedAssignment(s.to_string()))
}

/// Accept both the form's camelCase names and snake_case.
fn canonical_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect::<String>()
        .to_lowercase()
}

/// Build a partial update from edited fields. An empty value clears an
/// optional column; it is an error for a required one.
pub fn parse_patch<'a, I>(pairs: I) -> Result<IpoPatch, ValidationError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut patch = IpoPatch::default();

    for (key, value) in pairs {
        let v = non_blank(Some(value));
        debug!("patch field {} = {:?}", key, v);

        match canonical_key(key).as_str() {
            "companyid" => {
                patch.company_id = Some(parse_id("companyId", required("companyId", v)?)?)
            }
            "priceband" => patch.price_band = Some(text("priceBand", v)?),
            "opendate" => patch.open_date = Some(parse_date("openDate", required("openDate", v)?)?),
            "closedate" => {
                patch.close_date = Some(parse_date("closeDate", required("closeDate", v)?)?)
            }
            "issuesize" => patch.issue_size = Some(text("issueSize", v)?),
            "issuetype" => patch.issue_type = Some(text("issueType", v)?),
            "status" => patch.status = Some(required("status", v)?.parse()?),
            "listingdate" => patch.listing_date = Some(optional("listingDate", v, parse_date)?),
            "ipoprice" => patch.ipo_price = Some(optional("ipoPrice", v, parse_decimal)?),
            "listingprice" => {
                patch.listing_price = Some(optional("listingPrice", v, parse_decimal)?)
            }
            "listinggain" => patch.listing_gain = Some(optional("listingGain", v, parse_decimal)?),
            "currentmarketprice" => {
                patch.current_market_price = Some(optional("currentMarketPrice", v, parse_decimal)?)
            }
            "currentreturn" => {
                patch.current_return = Some(optional("currentReturn", v, parse_decimal)?)
            }
            _ => return Err(ValidationError::UnknownField(key.to_string())),
        }
    }

    Ok(patch)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
