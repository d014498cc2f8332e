use crate::pipeline::batch::TablePartitions;
use crate::storage::ObjectStorage;
use crate::utils::paths::TablePathBuilder;
use common::Result;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::sync::Arc;
use tracing::info;

const PART_FILE: &str = "part-00000.parquet";

/// Writes one parquet file per partition under
/// `<dest_root>/<table>/<col>=<value>/...`, replacing whatever the table
/// held before. Each table's prefix is exclusive to that table, so a
/// failed run never corrupts a neighbour.
pub struct TableWriter {
    storage: Arc<dyn ObjectStorage>,
    dest_root: String,
}

impl TableWriter {
    pub fn new(storage: Arc<dyn ObjectStorage>, dest_root: &str) -> Self {
        Self {
            storage,
            dest_root: dest_root.to_string(),
        }
    }

    pub async fn write_table(&self, table: &str, partitions: TablePartitions) -> Result<()> {
        self.clear_table(table).await?;

        let mut rows = 0usize;
        let files = partitions.len();
        for (partition_dir, batch) in partitions {
            let builder = TablePathBuilder::new(&self.dest_root, table);
            let key = if partition_dir.is_empty() {
                builder.build_file_path(PART_FILE)
            } else {
                builder.build_file_path(&format!("{}/{}", partition_dir, PART_FILE))
            };

            rows += batch.num_rows();
            let buffer = encode_parquet(&batch)?;
            self.storage.put_object(&key, &buffer).await?;
        }

        info!(table, files, rows, "Table written");
        Ok(())
    }

    /// Overwrite semantics: drop every key under the table prefix before
    /// writing, so stale partitions from a previous run cannot survive.
    async fn clear_table(&self, table: &str) -> Result<()> {
        let prefix = format!("{}/", TablePathBuilder::new(&self.dest_root, table).table_root());
        for key in self.storage.list_objects(&prefix).await? {
            self.storage.delete_object(&key).await?;
        }
        Ok(())
    }
}

fn encode_parquet(batch: &arrow::record_batch::RecordBatch) -> Result<Vec<u8>> {
    let mut buffer: Vec<u8> = Vec::new();

    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;

    Ok(buffer)
}
