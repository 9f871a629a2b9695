//! The library's source of time.

use std::fmt::Debug;

use pki_types::UnixTime;

/// Wall-clock time for certificate validity checks and session expiry.
///
/// Tests substitute their own to age cached sessions.
pub trait TimeProvider: Debug + Send + Sync {
    /// The current time, or `None` if it cannot be had.  Need not be
    /// monotonic.
    fn current_time(&self) -> Option<UnixTime>;
}

/// Reads the system clock.
#[derive(Debug)]
pub struct DefaultTimeProvider;

impl TimeProvider for DefaultTimeProvider {
    fn current_time(&self) -> Option<UnixTime> {
        Some(UnixTime::now())
    }
}
