use crate::models::{PlayEvent, SongplayRow};
use crate::pipeline::catalog::SongCatalog;

pub struct FactComposer;

impl FactComposer {
    /// Assembles the fact table: one row per play event, in event order,
    /// with song/artist ids resolved against the catalog where an exact
    /// (title, artist, duration) match exists. Misses keep the row and
    /// leave both ids null. The surrogate key counts up from zero.
    pub fn compose(plays: &[PlayEvent], catalog: &SongCatalog) -> Vec<SongplayRow> {
        plays
            .iter()
            .enumerate()
            .map(|(idx, play)| {
                let resolved = match (&play.song, &play.artist, play.length) {
                    (Some(song), Some(artist), Some(length)) => {
                        catalog.lookup(song, artist, length)
                    }
                    _ => None,
                };

                SongplayRow {
                    songplay_id: idx as i64,
                    start_time: play.start_time,
                    user_id: play.user_id.clone(),
                    level: play.level.clone(),
                    song_id: resolved.map(|(song_id, _)| song_id.to_string()),
                    artist_id: resolved.map(|(_, artist_id)| artist_id.to_string()),
                    session_id: play.session_id,
                    location: play.location.clone(),
                    user_agent: play.user_agent.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawSong;
    use crate::pipeline::catalog::CatalogExtractor;

    const START: i64 = 1_542_321_000_000;

    fn catalog() -> SongCatalog {
        let doc: RawSong = serde_json::from_value(serde_json::json!({
            "song_id": "SOSVWFT12A58A7C313",
            "title": "Broken-Down Merry-Go-Round",
            "artist_id": "ARNF6401187FB57032",
            "artist_name": "Sophie B. Hawkins",
            "duration": 177.5
        }))
        .unwrap();
        CatalogExtractor::extract(&[doc]).catalog
    }

    fn play(song: Option<&str>, artist: Option<&str>, length: Option<f64>) -> PlayEvent {
        PlayEvent {
            start_time: START,
            user_id: "15".to_string(),
            level: Some("paid".to_string()),
            song: song.map(str::to_string),
            artist: artist.map(str::to_string),
            length,
            session_id: Some(818),
            location: Some("Chicago-Naperville-Elgin, IL-IN-WI".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
        }
    }

    #[test]
    fn resolves_ids_on_exact_match() {
        let plays = vec![play(
            Some("Broken-Down Merry-Go-Round"),
            Some("Sophie B. Hawkins"),
            Some(177.5),
        )];

        let rows = FactComposer::compose(&plays, &catalog());

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].song_id.as_deref(), Some("SOSVWFT12A58A7C313"));
        assert_eq!(rows[0].artist_id.as_deref(), Some("ARNF6401187FB57032"));
        assert_eq!(rows[0].start_time, START);
    }

    #[test]
    fn misses_keep_the_row_with_null_ids() {
        let plays = vec![
            play(Some("Sehr kosmisch"), Some("Harmonia"), Some(655.77751)),
            play(None, None, None),
        ];

        let rows = FactComposer::compose(&plays, &catalog());

        // Row count matches the play count regardless of join success.
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert!(row.song_id.is_none());
            assert!(row.artist_id.is_none());
        }
    }

    #[test]
    fn duration_mismatch_is_a_miss() {
        let plays = vec![play(
            Some("Broken-Down Merry-Go-Round"),
            Some("Sophie B. Hawkins"),
            Some(177.49999),
        )];

        let rows = FactComposer::compose(&plays, &catalog());
        assert!(rows[0].song_id.is_none());
    }

    #[test]
    fn surrogate_keys_are_strictly_increasing() {
        let plays: Vec<PlayEvent> = (0..5)
            .map(|i| play(None, None, Some(i as f64)))
            .collect();

        let rows = FactComposer::compose(&plays, &catalog());

        let ids: Vec<i64> = rows.iter().map(|r| r.songplay_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }
}
