// Logger initialisation is process-global; every test that touches it runs serially.

use crate::logger::{LOG_FILE_NAME, initialize, level_for};

use log::LevelFilter;
use serial_test::serial;

/// **VALUE**: Verifies that calling initialize() multiple times doesn't panic or fail.
///
/// **WHY THIS MATTERS**: Tests and commands may both reach the initialiser. If the
/// second call tried to install another global logger, fern would error and the
/// command would exit before doing anything.
///
/// **BUG THIS CATCHES**: Would catch if the Once or AtomicBool guards are removed.
#[test]
#[serial]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A writable directory
    let temp_dir = tempfile::tempdir().expect("temp dir");

    // WHEN: Calling initialize twice
    let first = initialize(temp_dir.path(), false);
    let second = initialize(temp_dir.path(), true);

    // THEN: Both return Ok
    assert!(first.is_ok(), "first initialization should succeed");
    assert!(second.is_ok(), "second initialization should be a no-op");
}

/// **VALUE**: Verifies the verbose flag maps to trace and the default stays quieter.
///
/// **BUG THIS CATCHES**: Would catch `--verbose` being ignored, or the default level
/// being Trace and flooding the log file with every event frame.
#[test]
fn given_verbose_flag_when_choosing_level_then_trace_only_when_verbose() {
    assert_eq!(level_for(true), LevelFilter::Trace);
    assert!(level_for(false) < LevelFilter::Trace);
}

#[test]
fn given_log_file_name_then_it_is_companion_log() {
    assert_eq!(LOG_FILE_NAME, "companion.log");
}
