//! Error handling utilities

use tracing::error;

use crate::error::FanoutError;

/// Exit code for a failed run
///
/// Validation failures (bad input or options) exit with 2, everything else
/// with 1.
pub fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<FanoutError>() {
        Some(e) if e.is_validation() => 2,
        _ => 1,
    }
}

/// Report a fatal error and exit
///
/// With `verbose >= 1` the whole error chain is printed.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);
    eprintln!("Error: {error}");

    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    std::process::exit(exit_code(&error))
}
