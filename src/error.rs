use chrono::NaiveDate;
use thiserror::Error;

/// Input contract violations caught at the write path or when reading rows
/// back from storage.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("invalid status {0:?}: expected one of UPCOMING, OPEN, CLOSED, LISTED")]
    InvalidStatus(String),

    #[error("invalid status filter {0:?}: expected ALL or an IPO status")]
    InvalidStatusFilter(String),

    #[error("invalid sort key {0:?}: expected newest, oldest, gain-high, gain-low or name")]
    InvalidSortKey(String),

    #[error("{field}: invalid date {value:?}")]
    InvalidDate { field: &'static str, value: String },

    #[error("invalid date format {0:?}")]
    InvalidDateFormat(String),

    #[error("{field}: invalid number {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("unknown field {0:?}")]
    UnknownField(String),

    #[error("malformed assignment {0:?}: expected key=value")]
    MalformedAssignment(String),

    #[error("close date {close} is before open date {open}")]
    CloseBeforeOpen { open: NaiveDate, close: NaiveDate },

    #[error("company {0} does not exist")]
    UnknownCompany(i64),

    #[error("company name must not be blank")]
    BlankCompanyName,

    #[error("{0} must not contain line breaks or control characters")]
    ControlCharacter(&'static str),
}

/// Admin login failures.
#[derive(Debug, Error, PartialEq)]
pub enum AuthError {
    #[error("admin credentials required: pass --user and --password")]
    MissingCredentials,

    #[error("invalid admin credentials")]
    InvalidCredentials,
}
