use crate::error::pairing::PairingError;
use crate::pairing::code::{PAIRING_CODE_LEN, validate_pairing_code};

#[test]
fn given_six_digits_when_validating_then_ok() {
    assert!(validate_pairing_code("123456").is_ok());
    assert!(validate_pairing_code("000000").is_ok());
}

/// **VALUE**: Verifies malformed codes are rejected before any network call.
///
/// **BUG THIS CATCHES**: Would catch:
/// - A missing `^`/`$` anchor letting "1234567" through
/// - Non-ASCII digits (e.g. Arabic-Indic) matching `\d`
/// - Whitespace around the code being accepted
#[test]
fn given_malformed_codes_when_validating_then_invalid_code() {
    for code in ["", "12345", "1234567", "12a456", " 123456", "123456\n", "١٢٣٤٥٦"] {
        let result = validate_pairing_code(code);
        assert!(
            matches!(result, Err(PairingError::InvalidCode { .. })),
            "{code:?} should be rejected"
        );
    }
}

/// **VALUE**: Verifies the rejection message never echoes the code itself.
#[test]
fn given_wrong_length_code_when_validating_then_message_has_no_code() {
    let err = validate_pairing_code("98765").expect_err("too short");
    let message = err.to_string();

    assert!(!message.contains("98765"));
    assert!(message.contains(&PAIRING_CODE_LEN.to_string()));
}
