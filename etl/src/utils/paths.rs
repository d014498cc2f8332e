/// Directory value used when a partition column is null, matching the
/// convention of Hive-style writers.
pub const NULL_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// Builds hive-style `column=value` paths for a table under the
/// destination root.
pub struct TablePathBuilder {
    dest_root: String,
    table: String,
    partitions: Vec<(String, String)>,
}

impl TablePathBuilder {
    pub fn new(dest_root: &str, table: &str) -> Self {
        Self {
            dest_root: dest_root.trim_matches('/').to_string(),
            table: table.to_string(),
            partitions: Vec::new(),
        }
    }

    pub fn with_partition(mut self, column: &str, value: &str) -> Self {
        self.partitions
            .push((column.to_string(), value.to_string()));
        self
    }

    /// Key prefix owned exclusively by this table, e.g. `warehouse/tbl_songs`.
    pub fn table_root(&self) -> String {
        if self.dest_root.is_empty() {
            self.table.clone()
        } else {
            format!("{}/{}", self.dest_root, self.table)
        }
    }

    pub fn build_dir(&self) -> String {
        let mut dir = self.table_root();
        for (column, value) in &self.partitions {
            dir.push('/');
            dir.push_str(&format!("{}={}", column, value));
        }
        dir
    }

    pub fn build_file_path(&self, filename: &str) -> String {
        format!("{}/{}", self.build_dir(), filename)
    }
}

/// Renders an optional partition column value, mapping null to the
/// default-partition directory name.
pub fn partition_value(value: Option<&str>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => NULL_PARTITION.to_string(),
    }
}
