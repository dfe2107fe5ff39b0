use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};

use crate::Bar;

/// Fewest bars a series can have and still be worth analyzing
pub const MIN_BARS: usize = 5;

/// Bucket an ascending daily series into weeks ending Friday.
///
/// Each weekly bar takes the first open, the highest high, the lowest low,
/// the last close and adjusted close, and the summed volume of its bucket,
/// stamped on the Friday that closes the week (Saturday and Sunday bars
/// roll into the following week).
pub fn resample_weekly(daily: &[Bar]) -> Vec<Bar> {
    let mut weekly: Vec<Bar> = Vec::new();

    for bar in daily {
        let label = week_ending_friday(bar.timestamp);
        match weekly.last_mut() {
            Some(current) if current.timestamp == label => {
                current.high = current.high.max(bar.high);
                current.low = current.low.min(bar.low);
                current.close = bar.close;
                current.volume += bar.volume;
                current.adj_close = bar.adj_close;
            }
            _ => weekly.push(Bar {
                timestamp: label,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                adj_close: bar.adj_close,
            }),
        }
    }

    weekly
}

/// Midnight UTC of the Friday on or after the given timestamp
fn week_ending_friday(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    let weekday = timestamp.weekday().num_days_from_monday();
    let days_ahead = (Weekday::Fri.num_days_from_monday() + 7 - weekday) % 7;
    let date = timestamp.date_naive() + Duration::days(days_ahead as i64);
    date.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day_bar(y: i32, m: u32, d: u32, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume: 100.0,
            adj_close: Some(close),
        }
    }

    #[test]
    fn test_two_business_weeks() {
        // 2024-01-01 was a Monday
        let daily = vec![
            day_bar(2024, 1, 1, 10.0, 11.0, 9.0, 10.5),
            day_bar(2024, 1, 2, 10.5, 12.0, 10.0, 11.0),
            day_bar(2024, 1, 3, 11.0, 11.5, 8.0, 9.0),
            day_bar(2024, 1, 4, 9.0, 10.0, 8.5, 9.5),
            day_bar(2024, 1, 5, 9.5, 10.5, 9.0, 10.0),
            day_bar(2024, 1, 8, 10.0, 10.2, 9.8, 10.1),
            day_bar(2024, 1, 9, 10.1, 10.8, 10.0, 10.7),
        ];

        let weekly = resample_weekly(&daily);
        assert_eq!(weekly.len(), 2);

        let first = &weekly[0];
        assert_eq!(first.timestamp, Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap());
        assert!((first.open - 10.0).abs() < 1e-9);
        assert!((first.high - 12.0).abs() < 1e-9);
        assert!((first.low - 8.0).abs() < 1e-9);
        assert!((first.close - 10.0).abs() < 1e-9);
        assert!((first.volume - 500.0).abs() < 1e-9);

        let second = &weekly[1];
        assert_eq!(second.timestamp, Utc.with_ymd_and_hms(2024, 1, 12, 0, 0, 0).unwrap());
        assert!((second.open - 10.0).abs() < 1e-9);
        assert!((second.close - 10.7).abs() < 1e-9);
        assert!((second.volume - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_weekend_bars_roll_forward() {
        // 2024-01-06 was a Saturday: it belongs to the week ending the 12th
        let daily = vec![
            day_bar(2024, 1, 5, 10.0, 10.0, 10.0, 10.0),
            day_bar(2024, 1, 6, 11.0, 11.0, 11.0, 11.0),
            day_bar(2024, 1, 7, 12.0, 12.0, 12.0, 12.0),
        ];

        let weekly = resample_weekly(&daily);
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].timestamp, Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap());
        assert_eq!(weekly[1].timestamp, Utc.with_ymd_and_hms(2024, 1, 12, 0, 0, 0).unwrap());
        assert!((weekly[1].open - 11.0).abs() < 1e-9);
        assert!((weekly[1].close - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        assert!(resample_weekly(&[]).is_empty());
    }
}
