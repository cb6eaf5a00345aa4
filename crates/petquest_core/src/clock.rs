use time::{OffsetDateTime, UtcOffset};

/// The instant an operation runs at, plus the local offset that decides where
/// calendar days start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    pub now: i64,
    pub offset: UtcOffset,
}

impl Clock {
    pub fn system() -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            now: (now.unix_timestamp_nanos() / 1_000_000) as i64,
            offset: UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        }
    }

    pub fn at(now: i64, offset: UtcOffset) -> Self {
        Self { now, offset }
    }

    pub fn utc(now: i64) -> Self {
        Self::at(now, UtcOffset::UTC)
    }
}
