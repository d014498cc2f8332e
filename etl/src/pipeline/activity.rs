use crate::models::{PlayEvent, RawActivity, TimeRow, UserRow};
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::collections::HashSet;
use tracing::warn;

/// The page value that marks an event as a song play. Every derived table
/// is built from records carrying this marker only.
pub const NEXT_SONG_PAGE: &str = "NextSong";

#[derive(Debug, Default)]
pub struct ActivityTables {
    pub users: Vec<UserRow>,
    pub time: Vec<TimeRow>,
    pub plays: Vec<PlayEvent>,
}

pub struct ActivityExtractor;

impl ActivityExtractor {
    /// Filters the activity log to song-play events and derives the user and
    /// time dimensions plus the play set the fact table is built from.
    /// Records without a usable `ts` or `userId` are dropped entirely, so no
    /// partial rows reach any output.
    pub fn extract(records: &[RawActivity]) -> ActivityTables {
        let mut tables = ActivityTables::default();
        let mut seen_users = HashSet::new();
        let mut seen_times = HashSet::new();

        for record in records {
            if record.page.as_deref() != Some(NEXT_SONG_PAGE) {
                continue;
            }

            let Some(ts) = record.ts else {
                warn!("Dropping activity record without ts");
                continue;
            };
            let user_id = match record.user_id.as_deref() {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => {
                    warn!("Dropping activity record without userId");
                    continue;
                }
            };
            let Some(start) = DateTime::from_timestamp_millis(ts) else {
                warn!(ts, "Dropping activity record with out-of-range timestamp");
                continue;
            };
            let start_time = start.timestamp_millis();

            if seen_users.insert(user_id.clone()) {
                tables.users.push(UserRow {
                    user_id: user_id.clone(),
                    first_name: record.first_name.clone(),
                    last_name: record.last_name.clone(),
                    gender: record.gender.clone(),
                    level: record.level.clone(),
                });
            }

            if seen_times.insert(start_time) {
                tables.time.push(decompose(start));
            }

            tables.plays.push(PlayEvent {
                start_time,
                user_id,
                level: record.level.clone(),
                song: record.song.clone(),
                artist: record.artist.clone(),
                length: record.length,
                session_id: record.session_id,
                location: record.location.clone(),
                user_agent: record.user_agent.clone(),
            });
        }

        tables
    }
}

/// Decomposes a UTC timestamp into the calendar fields of the time
/// dimension. Week is the ISO week number; weekday counts from Sunday = 0.
fn decompose(start: DateTime<Utc>) -> TimeRow {
    TimeRow {
        start_time: start.timestamp_millis(),
        hour: start.hour() as i32,
        day: start.day() as i32,
        week: start.iso_week().week() as i32,
        month: start.month() as i32,
        year: start.year(),
        weekday: start.weekday().num_days_from_sunday() as i32,
    }
}
