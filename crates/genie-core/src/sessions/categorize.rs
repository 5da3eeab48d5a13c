//! Recency buckets for the session sidebar.

use std::fmt;

use chrono::{DateTime, NaiveTime, TimeDelta, TimeZone, Utc};

use super::model::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeBucket {
    Today,
    Last7Days,
    Last30Days,
    Older,
}

impl TimeBucket {
    /// Display order, newest first.
    pub const ALL: [TimeBucket; 4] = [
        TimeBucket::Today,
        TimeBucket::Last7Days,
        TimeBucket::Last30Days,
        TimeBucket::Older,
    ];

    pub fn title(self) -> &'static str {
        match self {
            TimeBucket::Today => "Today",
            TimeBucket::Last7Days => "Previous 7 days",
            TimeBucket::Last30Days => "Previous 30 days",
            TimeBucket::Older => "Older",
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorizedSessions {
    pub today: Vec<Session>,
    pub last_7_days: Vec<Session>,
    pub last_30_days: Vec<Session>,
    pub older: Vec<Session>,
}

impl CategorizedSessions {
    pub fn get(&self, bucket: TimeBucket) -> &[Session] {
        match bucket {
            TimeBucket::Today => &self.today,
            TimeBucket::Last7Days => &self.last_7_days,
            TimeBucket::Last30Days => &self.last_30_days,
            TimeBucket::Older => &self.older,
        }
    }

    fn get_mut(&mut self, bucket: TimeBucket) -> &mut Vec<Session> {
        match bucket {
            TimeBucket::Today => &mut self.today,
            TimeBucket::Last7Days => &mut self.last_7_days,
            TimeBucket::Last30Days => &mut self.last_30_days,
            TimeBucket::Older => &mut self.older,
        }
    }

    pub fn len(&self) -> usize {
        TimeBucket::ALL.iter().map(|b| self.get(*b).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Buckets that get a header, newest first.
    pub fn non_empty(&self) -> impl Iterator<Item = (TimeBucket, &[Session])> {
        TimeBucket::ALL
            .into_iter()
            .map(|b| (b, self.get(b)))
            .filter(|(_, sessions)| !sessions.is_empty())
    }
}

/// Midnight at the start of `now`'s calendar day, in `now`'s zone.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let tz = now.timezone();
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        // Midnight can fall in a DST gap; the day then starts an hour later.
        .or_else(|| {
            tz.from_local_datetime(&(midnight + TimeDelta::hours(1)))
                .earliest()
        })
        .map_or_else(|| now.with_timezone(&Utc), |start| start.with_timezone(&Utc))
}

/// Bucket for one timestamp given the start of today. Lower edges are inclusive.
pub fn bucket_for(updated_at: DateTime<Utc>, today_start: DateTime<Utc>) -> TimeBucket {
    if updated_at >= today_start {
        TimeBucket::Today
    } else if updated_at >= today_start - TimeDelta::days(7) {
        TimeBucket::Last7Days
    } else if updated_at >= today_start - TimeDelta::days(30) {
        TimeBucket::Last30Days
    } else {
        TimeBucket::Older
    }
}

/// Splits `sessions` by `updated_at` in one pass, keeping input order
/// inside each bucket.
pub fn categorize<Tz: TimeZone>(sessions: &[Session], now: &DateTime<Tz>) -> CategorizedSessions {
    let today_start = start_of_day(now);
    let mut out = CategorizedSessions::default();
    for session in sessions {
        out.get_mut(bucket_for(session.updated_at, today_start))
            .push(session.clone());
    }
    out
}

/// List-item timestamp: `HH:MM` within a day, `Nd ago` within a week,
/// otherwise the date. Rendered in `now`'s zone.
pub fn format_relative<Tz>(updated_at: DateTime<Utc>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let hours = now
        .with_timezone(&Utc)
        .signed_duration_since(updated_at)
        .num_hours()
        .max(0);
    let local = updated_at.with_timezone(&now.timezone());

    if hours < 24 {
        local.format("%H:%M").to_string()
    } else if hours < 24 * 7 {
        format!("{}d ago", hours / 24)
    } else {
        local.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    fn session(id: &str, updated_at: DateTime<Utc>) -> Session {
        Session::new(id, id, updated_at)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, 14, 30, 0).unwrap()
    }

    #[test]
    fn test_start_of_day_utc() {
        assert_eq!(
            start_of_day(&now()),
            Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_start_of_day_uses_now_zone() {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        // 2025-03-16 02:00 at +08:00
        let local_now = Utc
            .with_ymd_and_hms(2025, 3, 15, 18, 0, 0)
            .unwrap()
            .with_timezone(&tz);

        assert_eq!(
            start_of_day(&local_now),
            Utc.with_ymd_and_hms(2025, 3, 15, 16, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_bucket_edges_are_inclusive() {
        let start = start_of_day(&now());

        assert_eq!(bucket_for(start, start), TimeBucket::Today);
        assert_eq!(
            bucket_for(start - TimeDelta::seconds(1), start),
            TimeBucket::Last7Days
        );
        assert_eq!(
            bucket_for(start - TimeDelta::days(7), start),
            TimeBucket::Last7Days
        );
        assert_eq!(
            bucket_for(start - TimeDelta::days(7) - TimeDelta::seconds(1), start),
            TimeBucket::Last30Days
        );
        assert_eq!(
            bucket_for(start - TimeDelta::days(30), start),
            TimeBucket::Last30Days
        );
        assert_eq!(
            bucket_for(start - TimeDelta::days(30) - TimeDelta::seconds(1), start),
            TimeBucket::Older
        );
    }

    #[test]
    fn test_categorize_partitions_exactly() {
        let start = start_of_day(&now());
        let sessions: Vec<Session> = [0, 1, 5, 7 * 24, 8 * 24, 29 * 24, 31 * 24, 400 * 24]
            .iter()
            .enumerate()
            .map(|(i, h)| session(&format!("s{i}"), now() - TimeDelta::hours(*h)))
            .chain(std::iter::once(session("future", now() + TimeDelta::hours(2))))
            .collect();

        let grouped = categorize(&sessions, &now());

        assert_eq!(grouped.len(), sessions.len());
        for s in &sessions {
            let hits = TimeBucket::ALL
                .iter()
                .filter(|b| grouped.get(**b).iter().any(|g| g.id == s.id))
                .count();
            assert_eq!(hits, 1, "{} should be in exactly one bucket", s.id);
        }
        assert_eq!(
            grouped.today.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            vec!["s0", "s1", "s2", "future"]
        );
        assert!(grouped.older.iter().all(|s| s.updated_at < start - TimeDelta::days(30)));
    }

    #[test]
    fn test_exactly_seven_days_before_today_start_is_last_7_days() {
        let start = start_of_day(&now());
        let grouped = categorize(&[session("edge", start - TimeDelta::days(7))], &now());
        assert_eq!(grouped.last_7_days.len(), 1);
    }

    #[test]
    fn test_empty_buckets_have_no_header() {
        let grouped = categorize(&[session("a", now())], &now());
        let headers: Vec<_> = grouped.non_empty().map(|(b, _)| b.title()).collect();
        assert_eq!(headers, vec!["Today"]);
        assert!(categorize(&[], &now()).is_empty());
    }

    #[test]
    fn test_format_relative() {
        let now = now();
        assert_eq!(format_relative(now - TimeDelta::minutes(90), &now), "13:00");
        assert_eq!(format_relative(now - TimeDelta::hours(50), &now), "2d ago");
        assert_eq!(format_relative(now - TimeDelta::days(10), &now), "2025-03-05");
        assert_eq!(format_relative(now + TimeDelta::minutes(5), &now), "14:35");
    }

    #[test]
    fn test_format_relative_uses_now_zone() {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let local_now = now().with_timezone(&tz);
        assert_eq!(format_relative(now() - TimeDelta::hours(1), &local_now), "21:30");
    }
}
