use serde::Deserialize;

/// One song metadata document as it arrives from the catalog dump.
///
/// Key fields are optional at the deserialization layer so a document
/// missing its key can be dropped per-record instead of failing the read.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSong {
    pub song_id: Option<String>,
    pub title: Option<String>,
    pub artist_id: Option<String>,
    pub artist_name: Option<String>,
    pub artist_location: Option<String>,
    pub artist_latitude: Option<f64>,
    pub artist_longitude: Option<f64>,
    #[serde(default)]
    pub year: i32,
    pub duration: Option<f64>,
}

/// One application activity event from the newline-delimited logs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawActivity {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub ts: Option<i64>,
    #[serde(default)]
    pub session_id: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub song: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
}

/// A qualifying activity record after filtering, carrying the derived
/// calendar timestamp that links the fact table to tbl_time.
#[derive(Debug, Clone)]
pub struct PlayEvent {
    pub start_time: i64,
    pub user_id: String,
    pub level: Option<String>,
    pub song: Option<String>,
    pub artist: Option<String>,
    pub length: Option<f64>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongRow {
    pub song_id: String,
    pub title: Option<String>,
    pub artist_id: Option<String>,
    pub year: i32,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRow {
    pub artist_id: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
}

/// `start_time` is epoch milliseconds; the calendar fields are its UTC
/// decomposition. Weekday is Sunday-based, 0 through 6.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRow {
    pub start_time: i64,
    pub hour: i32,
    pub day: i32,
    pub week: i32,
    pub month: i32,
    pub year: i32,
    pub weekday: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongplayRow {
    pub songplay_id: i64,
    pub start_time: i64,
    pub user_id: String,
    pub level: Option<String>,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}
