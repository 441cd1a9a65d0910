//! Sequence tokens prefixed to generated migration names

use chrono::Utc;

/// Timestamp layout of [`TimestampSequence`]
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Produces the unique, lexicographically increasing prefix of new migrations
pub trait SequenceGenerator: Send + Sync {
    fn next_token(&self) -> String;
}

/// UTC timestamp with second granularity, e.g. `20250104123045`
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampSequence;

impl SequenceGenerator for TimestampSequence {
    fn next_token(&self) -> String {
        Utc::now().format(TIMESTAMP_FORMAT).to_string()
    }
}

impl<F> SequenceGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn next_token(&self) -> String {
        self()
    }
}
