pub mod activity;
pub mod batch;
pub mod catalog;
pub mod schema;
pub mod songplays;

pub use activity::{ActivityExtractor, ActivityTables};
pub use catalog::{CatalogExtractor, CatalogTables, SongCatalog};
pub use songplays::FactComposer;

use crate::models::{PlayEvent, RawActivity, RawSong};
use crate::storage;
use crate::storage::reader::JsonDocumentReader;
use crate::storage::writer::TableWriter;
use common::Result;
use common::config::Settings;
use tracing::info;

/// Coordinates the three transform stages over one storage backend:
/// catalog extraction and activity extraction run independently, then the
/// fact composer consumes both of their outputs.
pub struct EtlPipeline {
    reader: JsonDocumentReader,
    writer: TableWriter,
    catalog_root: String,
    activity_root: String,
}

impl EtlPipeline {
    pub async fn new(settings: &Settings) -> Result<Self> {
        let backend = storage::from_settings(&settings.storage).await?;

        Ok(Self {
            reader: JsonDocumentReader::new(backend.clone()),
            writer: TableWriter::new(backend, &settings.paths.dest_root),
            catalog_root: settings.paths.catalog_root.clone(),
            activity_root: settings.paths.activity_root.clone(),
        })
    }

    pub async fn run(&self) -> Result<()> {
        // Both sources are read up front, so an unreadable source aborts
        // the run before any table is overwritten.
        info!(prefix = %self.catalog_root, "Reading song catalog documents");
        let songs: Vec<RawSong> = self.reader.read_documents(&self.catalog_root).await?;
        info!(prefix = %self.activity_root, "Reading activity log records");
        let events: Vec<RawActivity> = self.reader.read_documents(&self.activity_root).await?;

        let catalog = self.process_song_data(&songs).await?;
        let plays = self.process_activity_data(&events).await?;
        self.process_songplays(&plays, &catalog).await?;

        Ok(())
    }

    /// Stage one: song and artist dimensions, plus the lookup the fact
    /// join resolves against.
    async fn process_song_data(&self, songs: &[RawSong]) -> Result<SongCatalog> {
        let tables = CatalogExtractor::extract(songs);
        info!(
            songs = tables.songs.len(),
            artists = tables.artists.len(),
            catalog_entries = tables.catalog.len(),
            "Catalog extracted"
        );

        self.writer
            .write_table("tbl_songs", batch::songs_partitions(&tables.songs)?)
            .await?;
        self.writer
            .write_table("tbl_artists", batch::artists_partitions(&tables.artists)?)
            .await?;

        Ok(tables.catalog)
    }

    /// Stage two: user and time dimensions plus the filtered play set.
    async fn process_activity_data(&self, events: &[RawActivity]) -> Result<Vec<PlayEvent>> {
        let tables = ActivityExtractor::extract(events);
        info!(
            users = tables.users.len(),
            time = tables.time.len(),
            plays = tables.plays.len(),
            "Activity extracted"
        );

        self.writer
            .write_table("tbl_users", batch::users_partitions(&tables.users)?)
            .await?;
        self.writer
            .write_table("tbl_time", batch::time_partitions(&tables.time)?)
            .await?;

        Ok(tables.plays)
    }

    /// Stage three: the fact table, strictly after both extractors.
    async fn process_songplays(&self, plays: &[PlayEvent], catalog: &SongCatalog) -> Result<()> {
        let rows = FactComposer::compose(plays, catalog);
        info!(rows = rows.len(), "Songplays composed");

        self.writer
            .write_table("tbl_songplays", batch::songplays_partitions(&rows)?)
            .await?;

        Ok(())
    }
}
