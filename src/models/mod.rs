use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

// ── Status ────────────────────────────────────────────────────────────────────

/// IPO lifecycle status. Only the all-caps spelling is accepted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum IpoStatus {
    Upcoming,
    Open,
    Closed,
    Listed,
}

impl IpoStatus {
    /// Fixed display order used by the status breakdown.
    pub const ALL: [IpoStatus; 4] = [
        IpoStatus::Upcoming,
        IpoStatus::Open,
        IpoStatus::Closed,
        IpoStatus::Listed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IpoStatus::Upcoming => "UPCOMING",
            IpoStatus::Open => "OPEN",
            IpoStatus::Closed => "CLOSED",
            IpoStatus::Listed => "LISTED",
        }
    }
}

impl fmt::Display for IpoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for IpoStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UPCOMING" => Ok(IpoStatus::Upcoming),
            "OPEN" => Ok(IpoStatus::Open),
            "CLOSED" => Ok(IpoStatus::Closed),
            "LISTED" => Ok(IpoStatus::Listed),
            other => Err(ValidationError::InvalidStatus(other.to_string())),
        }
    }
}

// ── Company ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub symbol: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCompany {
    pub name: String,
    pub symbol: Option<String>,
    pub logo: Option<String>,
}

// ── IPO ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ipo {
    pub id: i64,
    pub company_id: i64,
    pub price_band: String,     // "₹475 - ₹500"
    pub open_date: NaiveDate,
    pub close_date: NaiveDate,
    pub issue_size: String,     // free text, "₹3,042.51 Cr"
    pub issue_type: String,
    pub listing_date: Option<NaiveDate>,
    pub status: IpoStatus,
    pub ipo_price: Option<f64>,
    pub listing_price: Option<f64>,
    pub listing_gain: Option<f64>,
    pub current_market_price: Option<f64>,
    pub current_return: Option<f64>,
    pub created_at: NaiveDateTime,
}

/// Validated insert payload. Produced by `forms::parse_ipo_form`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIpo {
    pub company_id: i64,
    pub price_band: String,
    pub open_date: NaiveDate,
    pub close_date: NaiveDate,
    pub issue_size: String,
    pub issue_type: String,
    pub listing_date: Option<NaiveDate>,
    pub status: IpoStatus,
    pub ipo_price: Option<f64>,
    pub listing_price: Option<f64>,
    pub listing_gain: Option<f64>,
    pub current_market_price: Option<f64>,
    pub current_return: Option<f64>,
}

/// Partial update. Outer `None` leaves the field untouched; for optional
/// columns `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IpoPatch {
    pub company_id: Option<i64>,
    pub price_band: Option<String>,
    pub open_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    pub issue_size: Option<String>,
    pub issue_type: Option<String>,
    pub listing_date: Option<Option<NaiveDate>>,
    pub status: Option<IpoStatus>,
    pub ipo_price: Option<Option<f64>>,
    pub listing_price: Option<Option<f64>>,
    pub listing_gain: Option<Option<f64>>,
    pub current_market_price: Option<Option<f64>>,
    pub current_return: Option<Option<f64>>,
}

impl IpoPatch {
    pub fn is_empty(&self) -> bool {
        *self == IpoPatch::default()
    }

    /// Apply the patch onto a stored IPO, then re-check the date window.
    pub fn apply(&self, ipo: &mut Ipo) -> Result<(), ValidationError> {
        if let Some(v) = self.company_id {
            ipo.company_id = v;
        }
        if let Some(v) = &self.price_band {
            ipo.price_band = v.clone();
        }
        if let Some(v) = self.open_date {
            ipo.open_date = v;
        }
        if let Some(v) = self.close_date {
            ipo.close_date = v;
        }
        if let Some(v) = &self.issue_size {
            ipo.issue_size = v.clone();
        }
        if let Some(v) = &self.issue_type {
            ipo.issue_type = v.clone();
        }
        if let Some(v) = self.listing_date {
            ipo.listing_date = v;
        }
        if let Some(v) = self.status {
            ipo.status = v;
        }
        if let Some(v) = self.ipo_price {
            ipo.ipo_price = v;
        }
        if let Some(v) = self.listing_price {
            ipo.listing_price = v;
        }
        if let Some(v) = self.listing_gain {
            ipo.listing_gain = v;
        }
        if let Some(v) = self.current_market_price {
            ipo.current_market_price = v;
        }
        if let Some(v) = self.current_return {
            ipo.current_return = v;
        }

        check_date_window(ipo.open_date, ipo.close_date)
    }
}

pub fn check_date_window(open: NaiveDate, close: NaiveDate) -> Result<(), ValidationError> {
    if close < open {
        return Err(ValidationError::CloseBeforeOpen { open, close });
    }
    Ok(())
}

/// Text columns end up as single CSV cells and table rows.
pub fn check_single_line(field: &'static str, s: &str) -> Result<(), ValidationError> {
    if s.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacter(field));
    }
    Ok(())
}

// ── Documents ─────────────────────────────────────────────────────────────────

/// Prospectus files for one IPO: one RHP slot and one DRHP slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Documents {
    pub ipo_id: i64,
    pub rhp_pdf: Option<String>,
    pub drhp_pdf: Option<String>,
}

// ── Joined record ─────────────────────────────────────────────────────────────

/// An IPO with its company and documents, as handed to the engine and the
/// CSV formatter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IpoRecord {
    #[serde(flatten)]
    pub ipo: Ipo,
    pub company: Company,
    pub documents: Option<Documents>,
}

// ── Raw form input ────────────────────────────────────────────────────────────

/// Admin form submission: every field arrives as text.
#[derive(Debug, Clone, Default)]
pub struct RawIpoForm {
    pub company_id: Option<String>,
    pub price_band: Option<String>,
    pub open_date: Option<String>,
    pub close_date: Option<String>,
    pub issue_size: Option<String>,
    pub issue_type: Option<String>,
    pub listing_date: Option<String>,
    pub status: Option<String>,
    pub ipo_price: Option<String>,
    pub listing_price: Option<String>,
    pub listing_gain: Option<String>,
    pub current_market_price: Option<String>,
    pub current_return: Option<String>,
}
