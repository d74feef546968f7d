use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

use super::id::Id;
use crate::error::{self, ValidationError};
use crate::store::VotingStore;

pub const DEFAULT_VOTING_NAME: &str = "Union Chair Election";

/// One configured voting window. Rows are never edited; the most recently
/// created row is the one in force.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct VotingSettings {
    pub id: Id,
    pub voting_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UnvalidatedVotingSettings {
    #[serde(default)]
    pub voting_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub is_active: bool,
}

pub struct NewVotingSettings {
    pub voting_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
}

impl TryFrom<UnvalidatedVotingSettings> for NewVotingSettings {
    type Error = ValidationError;
    fn try_from(value: UnvalidatedVotingSettings) -> Result<Self, Self::Error> {
        let UnvalidatedVotingSettings { voting_name, start_time, end_time, is_active } = value;
        if start_time >= end_time {
            return Err(error::schedule_window_invalid(&start_time, &end_time));
        }

        let voting_name = match voting_name.trim() {
            "" => String::from(DEFAULT_VOTING_NAME),
            name => name.to_string(),
        };
        Ok(NewVotingSettings { voting_name, start_time, end_time, is_active })
    }
}

impl VotingSettings {
    pub fn new(
        NewVotingSettings { voting_name, start_time, end_time, is_active }: NewVotingSettings,
        now: DateTime<Utc>,
    ) -> VotingSettings {
        VotingSettings {
            id: Id::new(),
            voting_name,
            start_time,
            end_time,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduleStatus {
    Inactive,
    NotStarted,
    Active,
    Ended,
}

impl ScheduleStatus {
    pub fn describe(&self) -> &'static str {
        match self {
            ScheduleStatus::Inactive => "voting is not active",
            ScheduleStatus::NotStarted => "voting has not started yet",
            ScheduleStatus::Active => "voting is in progress",
            ScheduleStatus::Ended => "voting has ended",
        }
    }
}

/// The schedule as a voter sees it at one instant.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct VotingStatus {
    pub is_open: bool,
    pub is_active: bool,
    #[serde(rename = "time_remaining_ms", serialize_with = "as_millis")]
    pub time_remaining: Duration,
    pub time_remaining_display: String,
    pub status: ScheduleStatus,
    pub settings: Option<VotingSettings>,
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(duration.num_milliseconds())
}

impl VotingStatus {
    pub fn inactive() -> VotingStatus {
        VotingStatus {
            is_open: false,
            is_active: false,
            time_remaining: Duration::zero(),
            time_remaining_display: format_time_remaining(Duration::zero()),
            status: ScheduleStatus::Inactive,
            settings: None,
        }
    }

    /// Derives the status of `settings` at `now`. Both window ends are inclusive.
    pub fn resolve(settings: Option<VotingSettings>, now: DateTime<Utc>) -> VotingStatus {
        let Some(settings) = settings else {
            return VotingStatus::inactive();
        };

        let status = if !settings.is_active {
            ScheduleStatus::Inactive
        } else if now < settings.start_time {
            ScheduleStatus::NotStarted
        } else if now > settings.end_time {
            ScheduleStatus::Ended
        } else {
            ScheduleStatus::Active
        };

        let time_remaining = (settings.end_time - now).max(Duration::zero());
        VotingStatus {
            is_open: status == ScheduleStatus::Active,
            is_active: settings.is_active,
            time_remaining,
            time_remaining_display: format_time_remaining(time_remaining),
            status,
            settings: Some(settings),
        }
    }
}

/// Fetches the settings in force and resolves them at `now`. A failed fetch
/// reads as an inactive schedule.
pub fn resolve_schedule(store: &dyn VotingStore, now: DateTime<Utc>) -> VotingStatus {
    match store.latest_settings() {
        Ok(settings) => VotingStatus::resolve(settings, now),
        Err(err) => {
            warn!(error = %err, "could not load voting settings, treating schedule as inactive");
            VotingStatus::inactive()
        }
    }
}

/// Renders a countdown such as `2d 3h 0m 9s`, dropping leading zero units.
pub fn format_time_remaining(remaining: Duration) -> String {
    if remaining <= Duration::zero() {
        return String::from("voting has ended");
    }

    let days = remaining.num_days();
    let hours = remaining.num_hours() % 24;
    let minutes = remaining.num_minutes() % 60;
    let seconds = remaining.num_seconds() % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::store::{MemoryStore, StoreError};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap()
    }

    fn settings(start: DateTime<Utc>, end: DateTime<Utc>, is_active: bool) -> VotingSettings {
        VotingSettings::new(NewVotingSettings {
            voting_name: String::from(DEFAULT_VOTING_NAME),
            start_time: start,
            end_time: end,
            is_active,
        }, t0())
    }

    #[test]
    fn before_window_is_not_started() {
        let s = settings(t0() + Duration::hours(1), t0() + Duration::hours(2), true);
        let status = VotingStatus::resolve(Some(s), t0());
        assert_eq!(status.status, ScheduleStatus::NotStarted);
        assert!(!status.is_open);
    }

    #[test]
    fn inside_window_is_active_with_remaining_time() {
        let s = settings(t0() + Duration::hours(1), t0() + Duration::hours(2), true);
        let status = VotingStatus::resolve(Some(s), t0() + Duration::minutes(90));
        assert_eq!(status.status, ScheduleStatus::Active);
        assert!(status.is_open);
        assert_eq!(status.time_remaining, Duration::minutes(30));
        assert_eq!(status.time_remaining_display, "30m 0s");
    }

    #[test]
    fn after_window_is_ended_and_floored() {
        let s = settings(t0() - Duration::hours(2), t0() - Duration::hours(1), true);
        let status = VotingStatus::resolve(Some(s), t0());
        assert_eq!(status.status, ScheduleStatus::Ended);
        assert_eq!(status.time_remaining, Duration::zero());
    }

    #[test]
    fn inactive_flag_wins_over_times() {
        for now in [t0() - Duration::hours(5), t0() + Duration::minutes(30), t0() + Duration::hours(5)] {
            let s = settings(t0(), t0() + Duration::hours(1), false);
            let status = VotingStatus::resolve(Some(s), now);
            assert_eq!(status.status, ScheduleStatus::Inactive);
            assert!(!status.is_open);
        }
    }

    #[test]
    fn window_edges_are_open() {
        let s = settings(t0(), t0() + Duration::hours(1), true);
        assert!(VotingStatus::resolve(Some(s.clone()), t0()).is_open);
        assert!(VotingStatus::resolve(Some(s), t0() + Duration::hours(1)).is_open);
    }

    #[test]
    fn open_exactly_when_active() {
        let s = settings(t0(), t0() + Duration::hours(1), true);
        for offset in [-30, 0, 30, 60, 90] {
            let status = VotingStatus::resolve(Some(s.clone()), t0() + Duration::minutes(offset));
            assert_eq!(status.is_open, status.status == ScheduleStatus::Active);
        }
        assert!(!VotingStatus::resolve(None, t0()).is_open);
    }

    #[test]
    fn newest_settings_row_is_used() {
        let store = MemoryStore::new();
        store.insert_settings(settings(t0(), t0() + Duration::hours(1), false)).unwrap();
        let mut newer = settings(t0(), t0() + Duration::hours(1), true);
        newer.created_at = t0() + Duration::seconds(1);
        store.insert_settings(newer).unwrap();

        let status = resolve_schedule(&store, t0() + Duration::minutes(10));
        assert_eq!(status.status, ScheduleStatus::Active);
    }

    #[test]
    fn missing_or_unreachable_settings_are_inactive() {
        let store = MemoryStore::new();
        assert_eq!(resolve_schedule(&store, t0()), VotingStatus::inactive());

        store.fail_next(StoreError::Backend(String::from("connection refused")));
        assert_eq!(resolve_schedule(&store, t0()).status, ScheduleStatus::Inactive);
    }

    #[test]
    fn rejects_inverted_window_and_defaults_name() {
        let inverted = UnvalidatedVotingSettings {
            voting_name: String::new(),
            start_time: t0(),
            end_time: t0(),
            is_active: true,
        };
        assert!(NewVotingSettings::try_from(inverted).is_err());

        let ok = NewVotingSettings::try_from(UnvalidatedVotingSettings {
            voting_name: String::from("   "),
            start_time: t0(),
            end_time: t0() + Duration::days(1),
            is_active: true,
        }).unwrap();
        assert_eq!(ok.voting_name, DEFAULT_VOTING_NAME);
    }

    #[test]
    fn countdown_drops_leading_units() {
        assert_eq!(format_time_remaining(Duration::seconds(9)), "9s");
        assert_eq!(format_time_remaining(Duration::seconds(3 * 3600 + 9)), "3h 0m 9s");
        assert_eq!(format_time_remaining(Duration::seconds(2 * 86400 + 3 * 3600 + 9)), "2d 3h 0m 9s");
        assert_eq!(format_time_remaining(Duration::zero()), "voting has ended");
    }
}
