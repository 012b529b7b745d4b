use crate::ErrorLocation;
use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` captures file, line, and column.
///
/// **WHY THIS MATTERS**: Every error in the workspace carries an ErrorLocation. If the
/// capture is wrong, a "certificate decryption failed" report points at the wrong file.
///
/// **BUG THIS CATCHES**: Would catch if file or line extraction breaks.
#[test]
fn given_location_caller_when_error_location_created_then_captures_file_line_column() {
    // GIVEN: The line we are about to capture
    let expected_line = line!() + 3;

    // WHEN: Creating ErrorLocation from caller
    let location = ErrorLocation::from(Location::caller());

    // THEN: Should capture file, line, and column
    assert!(location.file.contains("error_location.rs"));
    assert_eq!(location.line, expected_line);
    assert!(location.column > 0);
}

/// **VALUE**: Verifies the Display format is `[file:line:column]`.
///
/// **BUG THIS CATCHES**: Would catch a format change that breaks log grepping.
#[test]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    // GIVEN: A fixed location
    let location = ErrorLocation {
        file: "src/pairing/mod.rs",
        line: 42,
        column: 7,
    };

    // WHEN
    let formatted = location.to_string();

    // THEN
    assert_eq!(formatted, "[src/pairing/mod.rs:42:7]");
}
