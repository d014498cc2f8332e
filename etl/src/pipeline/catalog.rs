use crate::models::{ArtistRow, RawSong, SongRow};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// In-memory lookup from (title, artist name, duration) to the catalog's
/// (song_id, artist_id), used to resolve the fact table's foreign keys.
#[derive(Debug, Default)]
pub struct SongCatalog {
    entries: HashMap<CatalogKey, (String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CatalogKey {
    title: String,
    artist_name: String,
    // Durations match on exact bit equality, no tolerance band.
    duration_bits: u64,
}

impl CatalogKey {
    fn new(title: &str, artist_name: &str, duration: f64) -> Self {
        Self {
            title: title.to_string(),
            artist_name: artist_name.to_string(),
            duration_bits: duration.to_bits(),
        }
    }
}

impl SongCatalog {
    pub fn lookup(&self, song: &str, artist: &str, length: f64) -> Option<(&str, &str)> {
        self.entries
            .get(&CatalogKey::new(song, artist, length))
            .map(|(song_id, artist_id)| (song_id.as_str(), artist_id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct CatalogTables {
    pub songs: Vec<SongRow>,
    pub artists: Vec<ArtistRow>,
    pub catalog: SongCatalog,
}

pub struct CatalogExtractor;

impl CatalogExtractor {
    /// Projects the song and artist dimensions out of the raw catalog
    /// documents. Each dimension deduplicates on its own key with the first
    /// occurrence in read order winning; documents missing a key field are
    /// dropped from that dimension only.
    pub fn extract(docs: &[RawSong]) -> CatalogTables {
        let mut tables = CatalogTables::default();
        let mut seen_songs = HashSet::new();
        let mut seen_artists = HashSet::new();

        for doc in docs {
            match &doc.song_id {
                Some(song_id) => {
                    if seen_songs.insert(song_id.clone()) {
                        tables.songs.push(SongRow {
                            song_id: song_id.clone(),
                            title: doc.title.clone(),
                            artist_id: doc.artist_id.clone(),
                            year: doc.year,
                            duration: doc.duration,
                        });
                    }
                }
                None => warn!("Dropping song document without song_id"),
            }

            match &doc.artist_id {
                Some(artist_id) => {
                    if seen_artists.insert(artist_id.clone()) {
                        tables.artists.push(ArtistRow {
                            artist_id: artist_id.clone(),
                            name: doc.artist_name.clone(),
                            location: doc.artist_location.clone(),
                            latitude: doc.artist_latitude,
                            longitude: doc.artist_longitude,
                        });
                    }
                }
                None => warn!("Dropping song document without artist_id"),
            }

            // The join lookup needs all three match fields plus both ids.
            if let (Some(song_id), Some(artist_id), Some(title), Some(name), Some(duration)) = (
                &doc.song_id,
                &doc.artist_id,
                &doc.title,
                &doc.artist_name,
                doc.duration,
            ) {
                tables
                    .catalog
                    .entries
                    .entry(CatalogKey::new(title, name, duration))
                    .or_insert_with(|| (song_id.clone(), artist_id.clone()));
            }
        }

        tables
    }
}
