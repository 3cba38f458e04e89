//! Base-unit amounts and decimal conversion.
//!
//! All amounts are integers in the base asset's smallest unit. The base
//! asset has 18 decimals, so one whole token is [`WAD`] base units.

use crate::{Result, TypesError};

/// An amount of the base asset in base units.
pub type Amount = u128;

/// Number of decimals of the base asset.
pub const DECIMALS: u32 = 18;

/// Base units per whole token (10^18).
pub const WAD: Amount = 1_000_000_000_000_000_000;

/// Convert a whole-token count to base units.
///
/// Saturates at `u128::MAX`; callers pass human-scale values.
pub fn tokens(whole: u64) -> Amount {
    (whole as u128).saturating_mul(WAD)
}

/// Parse a decimal token string such as `"1000"` or `"0.25"` into base units.
///
/// # Errors
///
/// - [`TypesError::InvalidAmount`] if the string is malformed, has more than
///   [`DECIMALS`] fractional digits, or overflows `u128`
pub fn parse_units(text: &str) -> Result<Amount> {
    let text = text.trim();
    let invalid = || TypesError::InvalidAmount(text.to_string());

    let (whole, frac) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if frac.len() > DECIMALS as usize {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole_units: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let mut frac_units: u128 = if frac.is_empty() {
        0
    } else {
        frac.parse().map_err(|_| invalid())?
    };
    frac_units *= 10u128.pow(DECIMALS - frac.len() as u32);

    whole_units
        .checked_mul(WAD)
        .and_then(|v| v.checked_add(frac_units))
        .ok_or_else(invalid)
}

/// Format base units as a decimal token string, trimming trailing zeros.
pub fn format_units(amount: Amount) -> String {
    let whole = amount / WAD;
    let frac = amount % WAD;
    if frac == 0 {
        return whole.to_string();
    }
    let frac_str = format!("{:0width$}", frac, width = DECIMALS as usize);
    format!("{}.{}", whole, frac_str.trim_end_matches('0'))
}
