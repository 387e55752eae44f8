//! Poll lookback computation
//!
//! Polls cover `[now - lookback, now]`. The lookback is the caller-supplied
//! interval when one is given; otherwise the scheduler default, except
//! during the nightly catch-up window (03:00-03:05 local) where it extends
//! to a full day to absorb any drift the short windows missed.

use chrono::{NaiveDateTime, Timelike};
use std::time::Duration;

/// Start of the nightly catch-up window (hour, last matching minute)
const CATCH_UP_HOUR: u32 = 3;
const CATCH_UP_LAST_MINUTE: u32 = 5;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Default lookback of the new-order poll
pub const NEW_ORDERS_DEFAULT: Duration = Duration::from_secs(5 * 60);

/// Default lookback of the cancellation poll
pub const CANCEL_DEFAULT: Duration = Duration::from_secs(30 * 60);

/// Compute the poll lookback for a local wall-clock time
pub fn lookback(now_local: NaiveDateTime, explicit: Option<Duration>, default: Duration) -> Duration {
    if let Some(interval) = explicit {
        return interval;
    }

    if now_local.hour() == CATCH_UP_HOUR && now_local.minute() <= CATCH_UP_LAST_MINUTE {
        return DAY;
    }

    default
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_catch_up_window_extends_to_one_day() {
        assert_eq!(lookback(at(3, 0), None, NEW_ORDERS_DEFAULT), DAY);
        assert_eq!(lookback(at(3, 2), None, NEW_ORDERS_DEFAULT), DAY);
        assert_eq!(lookback(at(3, 5), None, CANCEL_DEFAULT), DAY);
    }

    #[test]
    fn test_outside_catch_up_uses_default() {
        assert_eq!(lookback(at(10, 0), None, NEW_ORDERS_DEFAULT), NEW_ORDERS_DEFAULT);
        assert_eq!(lookback(at(10, 0), None, CANCEL_DEFAULT), CANCEL_DEFAULT);
        // One minute past the window
        assert_eq!(lookback(at(3, 6), None, CANCEL_DEFAULT), CANCEL_DEFAULT);
        // Same minutes at a different hour
        assert_eq!(lookback(at(4, 2), None, CANCEL_DEFAULT), CANCEL_DEFAULT);
    }

    #[test]
    fn test_explicit_interval_wins_everywhere() {
        let explicit = Duration::from_secs(7 * 60);
        assert_eq!(lookback(at(3, 2), Some(explicit), CANCEL_DEFAULT), explicit);
        assert_eq!(lookback(at(10, 0), Some(explicit), CANCEL_DEFAULT), explicit);
    }
}
