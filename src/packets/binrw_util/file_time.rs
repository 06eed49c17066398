//! FILETIME wrapper, per [MS-DTYP] 2.3.3: 100-nanosecond intervals since
//! January 1, 1601 (UTC).

use std::fmt::Display;
use std::ops::Deref;

use binrw::prelude::*;
use time::macros::datetime;
use time::OffsetDateTime;

#[derive(BinRead, BinWrite, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct FileTime {
    value: u64,
}

impl FileTime {
    const EPOCH: OffsetDateTime = datetime!(1601-01-01 00:00:00 UTC);
    const INTERVALS_PER_SEC: u64 = 10_000_000;

    /// The current wall-clock time, in UTC.
    pub fn now() -> Self {
        OffsetDateTime::now_utc().into()
    }

    pub fn date_time(&self) -> OffsetDateTime {
        let duration = core::time::Duration::from_nanos(self.value.saturating_mul(100));
        Self::EPOCH + duration
    }
}

impl From<u64> for FileTime {
    fn from(value: u64) -> Self {
        Self { value }
    }
}

impl From<OffsetDateTime> for FileTime {
    fn from(dt: OffsetDateTime) -> Self {
        let delta = dt - Self::EPOCH;
        Self {
            value: delta.whole_seconds() as u64 * Self::INTERVALS_PER_SEC
                + delta.subsec_nanoseconds() as u64 / 100,
        }
    }
}

impl Deref for FileTime {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl Display for FileTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.date_time().fmt(f)
    }
}

impl std::fmt::Debug for FileTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FileTime").field(&self.date_time()).finish()
    }
}
