use crate::models::{ArtistRow, SongRow, SongplayRow, TimeRow, UserRow};
use crate::pipeline::schema;
use crate::utils::paths::partition_value;
use arrow::array::{
    ArrayRef, Float64Array, Int32Array, Int64Array, StringArray, TimestampMillisecondArray,
};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Datelike};
use common::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One parquet file per entry: the relative partition directory (empty for
/// an unpartitioned table) and its rows encoded as a single batch. The
/// BTreeMap grouping keeps partition order deterministic across runs.
pub type TablePartitions = Vec<(String, RecordBatch)>;

pub fn songs_partitions(rows: &[SongRow]) -> Result<TablePartitions> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut groups: BTreeMap<String, Vec<&SongRow>> = BTreeMap::new();
    for row in rows {
        let dir = format!(
            "year={}/artist_id={}",
            row.year,
            partition_value(row.artist_id.as_deref())
        );
        groups.entry(dir).or_default().push(row);
    }

    groups
        .into_iter()
        .map(|(dir, rows)| Ok((dir, songs_batch(&rows)?)))
        .collect()
}

fn songs_batch(rows: &[&SongRow]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.song_id.as_str()),
        )),
        Arc::new(StringArray::from_iter(
            rows.iter().map(|r| r.title.as_deref()),
        )),
        Arc::new(StringArray::from_iter(
            rows.iter().map(|r| r.artist_id.as_deref()),
        )),
        Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.year))),
        Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.duration))),
    ];
    Ok(RecordBatch::try_new(
        Arc::new(schema::songs_schema()),
        columns,
    )?)
}

pub fn artists_partitions(rows: &[ArtistRow]) -> Result<TablePartitions> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.artist_id.as_str()),
        )),
        Arc::new(StringArray::from_iter(
            rows.iter().map(|r| r.name.as_deref()),
        )),
        Arc::new(StringArray::from_iter(
            rows.iter().map(|r| r.location.as_deref()),
        )),
        Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.latitude))),
        Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.longitude))),
    ];
    let batch = RecordBatch::try_new(Arc::new(schema::artists_schema()), columns)?;
    Ok(vec![(String::new(), batch)])
}

pub fn users_partitions(rows: &[UserRow]) -> Result<TablePartitions> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.user_id.as_str()),
        )),
        Arc::new(StringArray::from_iter(
            rows.iter().map(|r| r.first_name.as_deref()),
        )),
        Arc::new(StringArray::from_iter(
            rows.iter().map(|r| r.last_name.as_deref()),
        )),
        Arc::new(StringArray::from_iter(
            rows.iter().map(|r| r.gender.as_deref()),
        )),
        Arc::new(StringArray::from_iter(
            rows.iter().map(|r| r.level.as_deref()),
        )),
    ];
    let batch = RecordBatch::try_new(Arc::new(schema::users_schema()), columns)?;
    Ok(vec![(String::new(), batch)])
}

pub fn time_partitions(rows: &[TimeRow]) -> Result<TablePartitions> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut groups: BTreeMap<String, Vec<&TimeRow>> = BTreeMap::new();
    for row in rows {
        let dir = format!("year={}/month={:02}", row.year, row.month);
        groups.entry(dir).or_default().push(row);
    }

    groups
        .into_iter()
        .map(|(dir, rows)| Ok((dir, time_batch(&rows)?)))
        .collect()
}

fn time_batch(rows: &[&TimeRow]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(TimestampMillisecondArray::from_iter_values(
            rows.iter().map(|r| r.start_time),
        )),
        Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.hour))),
        Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.day))),
        Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.week))),
        Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.month))),
        Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.year))),
        Arc::new(Int32Array::from_iter_values(
            rows.iter().map(|r| r.weekday),
        )),
    ];
    Ok(RecordBatch::try_new(
        Arc::new(schema::time_schema()),
        columns,
    )?)
}

pub fn songplays_partitions(rows: &[SongplayRow]) -> Result<TablePartitions> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut groups: BTreeMap<String, Vec<&SongplayRow>> = BTreeMap::new();
    for row in rows {
        // Partition values come from the derived calendar timestamp.
        let start = DateTime::from_timestamp_millis(row.start_time).ok_or_else(|| {
            Error::InvalidInput(format!("start_time {} out of range", row.start_time))
        })?;
        let dir = format!("year={}/month={:02}", start.year(), start.month());
        groups.entry(dir).or_default().push(row);
    }

    groups
        .into_iter()
        .map(|(dir, rows)| Ok((dir, songplays_batch(&rows)?)))
        .collect()
}

fn songplays_batch(rows: &[&SongplayRow]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(
            rows.iter().map(|r| r.songplay_id),
        )),
        Arc::new(TimestampMillisecondArray::from_iter_values(
            rows.iter().map(|r| r.start_time),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.user_id.as_str()),
        )),
        Arc::new(StringArray::from_iter(
            rows.iter().map(|r| r.level.as_deref()),
        )),
        Arc::new(StringArray::from_iter(
            rows.iter().map(|r| r.song_id.as_deref()),
        )),
        Arc::new(StringArray::from_iter(
            rows.iter().map(|r| r.artist_id.as_deref()),
        )),
        Arc::new(Int64Array::from_iter(rows.iter().map(|r| r.session_id))),
        Arc::new(StringArray::from_iter(
            rows.iter().map(|r| r.location.as_deref()),
        )),
        Arc::new(StringArray::from_iter(
            rows.iter().map(|r| r.user_agent.as_deref()),
        )),
    ];
    Ok(RecordBatch::try_new(
        Arc::new(schema::songplays_schema()),
        columns,
    )?)
}
