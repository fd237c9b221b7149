//! Clock functions returning the current instant in UTC.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Function returning the current time in UTC.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Current wall-clock time in UTC.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// The default clock, backed by [`now`].
pub fn system() -> Clock {
    Arc::new(now)
}

/// A clock frozen at `instant`.
pub fn fixed(instant: DateTime<Utc>) -> Clock {
    Arc::new(move || instant)
}

pub fn from_fn<F>(f: F) -> Clock
where
    F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
{
    Arc::new(f)
}
