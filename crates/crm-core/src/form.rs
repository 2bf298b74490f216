//! Helpers for turning raw form input into typed values.
//!
//! Drafts check every required field for presence first, in declaration
//! order, and only then parse values. The first blank field wins.

use crate::error::{CrmError, Result};
use std::str::FromStr;

/// Trimmed value of a required field, or `MissingField` when absent or blank.
pub fn required<'a>(field: &'static str, value: Option<&'a str>) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(CrmError::MissingField(field)),
    }
}

/// Trimmed value of an optional field; blank input counts as absent.
pub fn optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse an optional field whose value comes from a fixed option list.
pub fn optional_choice<T>(value: Option<&str>) -> Result<Option<T>>
where
    T: FromStr<Err = CrmError>,
{
    optional(value).map(T::from_str).transpose()
}
