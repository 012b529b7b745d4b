use crate::error::pairing::PairingError;

use std::sync::OnceLock;

use regex::Regex;

pub const PAIRING_CODE_LEN: usize = 6;
const PAIRING_CODE_PATTERN: &str = r"^[0-9]{6}$";

static PAIRING_CODE_REGEX: OnceLock<Regex> = OnceLock::new();

pub(crate) fn get_pairing_code_regex() -> &'static Regex {
    PAIRING_CODE_REGEX.get_or_init(|| Regex::new(PAIRING_CODE_PATTERN).expect("valid regex pattern"))
}

/// Exactly six ASCII digits. Checked before any network traffic.
///
/// The rejection reason never echoes the code back.
pub fn validate_pairing_code(code: &str) -> Result<(), PairingError> {
    if code.is_empty() {
        return Err(PairingError::invalid_code("pairing code is empty"));
    }

    if !get_pairing_code_regex().is_match(code) {
        return Err(PairingError::invalid_code(format!(
            "pairing code must be exactly {PAIRING_CODE_LEN} digits (got {} characters)",
            code.chars().count()
        )));
    }

    Ok(())
}
