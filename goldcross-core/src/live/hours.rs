//! Exchange session window.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Daily trading window in exchange-local time.
///
/// The window is inclusive of the open and exclusive of the close. Windows
/// that span midnight (close before open) are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl TradingHours {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close }
    }

    /// NSE cash session, 09:15 to 15:30.
    pub fn nse() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(15, 30, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.open <= self.close {
            time >= self.open && time < self.close
        } else {
            // Overnight window.
            time >= self.open || time < self.close
        }
    }

    /// Seconds until the next open, 0 when already inside the window.
    pub fn seconds_until_open(&self, time: NaiveTime) -> u32 {
        if self.contains(time) {
            return 0;
        }
        let now = time.num_seconds_from_midnight();
        let open = self.open.num_seconds_from_midnight();
        if now < open {
            open - now
        } else {
            86_400 - now + open
        }
    }
}
