//! Charges payment reference numbers.
//!
//! Format: `PAY-<YYYYMMDD>-<TYPE>-<ORG3>-<seq>`, where `<seq>` is at least three
//! digits and comes from an atomic per-(organisation, type, day) counter.

use chrono::NaiveDate;

use super::types::ChargeType;

/// Code used when an organisation name has no alphanumeric characters.
pub const FALLBACK_ORG_CODE: &str = "ORG";

/// First three alphanumeric characters of the organisation name, uppercased.
#[must_use]
pub fn org_code(organisation_name: &str) -> String {
    let code: String = organisation_name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(3)
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if code.is_empty() {
        FALLBACK_ORG_CODE.to_string()
    } else {
        code
    }
}

/// Builds a reference number.
#[must_use]
pub fn reference_number(
    date: NaiveDate,
    charge_type: ChargeType,
    organisation_name: &str,
    sequence: u32,
) -> String {
    format!(
        "PAY-{}-{}-{}-{sequence:03}",
        date.format("%Y%m%d"),
        charge_type.as_str(),
        org_code(organisation_name)
    )
}
