//! Input validation for entry writes.
//!
//! Entry documents come from forms and the sales flow with loosely typed
//! fields. These helpers turn them into the typed values stored on an
//! [`Entry`](super::types::Entry), rejecting what cannot be stored.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use super::dates::normalize_date;
use super::error::LedgerError;
use super::types::{EntryKind, EntryStatus};

/// Largest storable entry value: 2^53 cents (90 071 992 547 409.92).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0, 2_097_152, 0, false, 2);

/// Returns true for values an entry may carry: zero up to [`MAX_AMOUNT`].
#[must_use]
pub fn amount_in_range(amount: Decimal) -> bool {
    (!amount.is_sign_negative() || amount.is_zero()) && amount <= MAX_AMOUNT
}

/// Parses an entry value.
///
/// Absent or `null` values read as zero, the way the entry form submits an
/// empty field. Numbers and numeric strings are accepted; a decimal comma is
/// read as a decimal point.
///
/// # Errors
///
/// Returns `LedgerError::InvalidAmount` for negative, non-numeric or
/// out-of-range values.
pub fn parse_amount(value: Option<&Value>) -> Result<Decimal, LedgerError> {
    let amount = match value {
        None | Some(Value::Null) => return Ok(Decimal::ZERO),
        Some(Value::Number(number)) => {
            let raw = number.to_string();
            Decimal::from_str(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .map_err(|_| LedgerError::InvalidAmount(raw))?
        }
        Some(Value::String(raw)) => {
            let cleaned = raw.trim().replace(',', ".");
            if cleaned.is_empty() {
                return Ok(Decimal::ZERO);
            }
            Decimal::from_str(&cleaned).map_err(|_| LedgerError::InvalidAmount(raw.clone()))?
        }
        Some(other) => return Err(LedgerError::InvalidAmount(other.to_string())),
    };

    if !amount_in_range(amount) {
        return Err(LedgerError::InvalidAmount(amount.to_string()));
    }
    Ok(amount.normalize())
}

/// Parses `tipo`, defaulting to `ENTRADA`.
///
/// # Errors
///
/// Returns `LedgerError::InvalidKind` for anything other than `ENTRADA`/`SAIDA`.
pub fn parse_kind(value: Option<&str>) -> Result<EntryKind, LedgerError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(EntryKind::default()),
        Some(raw) => EntryKind::from_str(raw).map_err(|_| LedgerError::InvalidKind(raw.to_string())),
    }
}

/// Parses the status a new entry may start in: `PENDENTE` (the default) or
/// a member of the confirmed set.
///
/// # Errors
///
/// Returns `LedgerError::InvalidStatus` for unknown statuses and for
/// `CANCELADO`/`ESTORNADO`, which are reached only through the workflow.
pub fn parse_initial_status(value: Option<&str>) -> Result<EntryStatus, LedgerError> {
    let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(EntryStatus::Pendente);
    };
    let status = EntryStatus::from_str(raw).map_err(|_| LedgerError::InvalidStatus(raw.to_string()))?;
    if status.is_pending() || status.is_confirmed() {
        Ok(status)
    } else {
        Err(LedgerError::InvalidStatus(raw.to_string()))
    }
}

/// Normalizes an optional date field.
///
/// `None` and `null` read as absent. A present value that does not
/// normalize is an error naming the field.
///
/// # Errors
///
/// Returns `LedgerError::InvalidDate` when the value is present but unusable.
pub fn parse_date(field: &'static str, value: Option<&Value>) -> Result<Option<DateTime<Utc>>, LedgerError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => normalize_date(raw).map(Some).ok_or(LedgerError::InvalidDate(field)),
    }
}
