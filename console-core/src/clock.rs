//! Injectable time source for grant-window evaluation.

use chrono::Utc;

/// Time source used when deciding whether a grant is active.
///
/// Server state holds one `Clock` value; production uses [`Clock::System`],
/// tests pin a [`Clock::Fixed`] instant so time-window scenarios are
/// deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    /// Wall-clock time.
    #[default]
    System,
    /// A fixed Unix timestamp in seconds.
    Fixed(i64),
}

impl Clock {
    /// Returns the current time as Unix seconds.
    #[must_use]
    pub fn now_unix(&self) -> i64 {
        match self {
            Self::System => Utc::now().timestamp(),
            Self::Fixed(t) => *t,
        }
    }
}
