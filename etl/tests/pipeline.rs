use arrow::array::{Array, Int32Array, Int64Array, StringArray, TimestampMillisecondArray};
use arrow::record_batch::RecordBatch;
use common::config::{PathsConfig, Settings, StorageConfig, StorageMode};
use etl::pipeline::EtlPipeline;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

// 2018-11-15T22:30:00Z
const MATCHED_TS: i64 = 1_542_321_000_000;
// 2018-11-15T23:00:00Z
const UNMATCHED_TS: i64 = 1_542_322_800_000;

const SONG_DOC: &str = r#"{"song_id": "SOSVWFT12A58A7C313", "title": "Broken-Down Merry-Go-Round", "artist_id": "ARNF6401187FB57032", "artist_name": "Sophie B. Hawkins", "artist_location": "New York, NY", "artist_latitude": 40.79086, "artist_longitude": -73.96644, "year": 1994, "duration": 177.5}"#;

fn log_lines() -> String {
    [
        // Matches the catalog entry exactly.
        format!(
            r#"{{"userId": "15", "firstName": "Lily", "lastName": "Koch", "gender": "F", "level": "paid", "ts": {MATCHED_TS}, "sessionId": 818, "location": "Chicago-Naperville-Elgin, IL-IN-WI", "userAgent": "Mozilla/5.0", "page": "NextSong", "song": "Broken-Down Merry-Go-Round", "artist": "Sophie B. Hawkins", "length": 177.5}}"#
        ),
        // No catalog match.
        format!(
            r#"{{"userId": "16", "firstName": "Rylan", "lastName": "George", "gender": "M", "level": "free", "ts": {UNMATCHED_TS}, "sessionId": 820, "location": "Birmingham-Hoover, AL", "userAgent": "Mozilla/5.0", "page": "NextSong", "song": "Sehr kosmisch", "artist": "Harmonia", "length": 655.77751}}"#
        ),
        // Not a song play; must appear nowhere.
        format!(
            r#"{{"userId": "15", "firstName": "Lily", "lastName": "Koch", "gender": "F", "level": "paid", "ts": {MATCHED_TS}, "sessionId": 818, "page": "Home"}}"#
        ),
        // Missing userId; dropped from every output.
        format!(r#"{{"ts": {MATCHED_TS}, "page": "NextSong"}}"#),
    ]
    .join("\n")
}

fn settings(root: &Path) -> Settings {
    Settings {
        storage: StorageConfig {
            mode: StorageMode::Local,
            local_root: root.to_string_lossy().into_owned(),
            endpoint: String::new(),
            region: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            bucket: String::new(),
        },
        paths: PathsConfig {
            catalog_root: "song_data".to_string(),
            activity_root: "log_data".to_string(),
            dest_root: "warehouse".to_string(),
        },
    }
}

fn read_table(dir: &Path) -> Vec<RecordBatch> {
    let mut batches = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|e| e == "parquet") {
                let file = File::open(&path).unwrap();
                let reader = ParquetRecordBatchReaderBuilder::try_new(file)
                    .unwrap()
                    .build()
                    .unwrap();
                for batch in reader {
                    batches.push(batch.unwrap());
                }
            }
        }
    }
    batches
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> &'a StringArray {
    batch
        .column_by_name(name)
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap()
}

async fn run_pipeline(root: &Path) {
    std::fs::create_dir_all(root.join("song_data/A/A/A")).unwrap();
    std::fs::create_dir_all(root.join("log_data/2018/11")).unwrap();
    std::fs::write(root.join("song_data/A/A/A/TRAAAAW128F429D538.json"), SONG_DOC).unwrap();
    std::fs::write(root.join("log_data/2018/11/2018-11-15-events.json"), log_lines()).unwrap();

    let pipeline = EtlPipeline::new(&settings(root)).await.unwrap();
    pipeline.run().await.unwrap();
}

#[tokio::test]
async fn builds_the_full_star_schema() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    run_pipeline(root).await;

    let warehouse = root.join("warehouse");

    // Dimensions derived from the catalog.
    let songs = read_table(&warehouse.join("tbl_songs"));
    assert_eq!(songs.iter().map(|b| b.num_rows()).sum::<usize>(), 1);
    assert_eq!(
        string_column(&songs[0], "song_id").value(0),
        "SOSVWFT12A58A7C313"
    );

    let artists = read_table(&warehouse.join("tbl_artists"));
    assert_eq!(artists.iter().map(|b| b.num_rows()).sum::<usize>(), 1);
    assert_eq!(string_column(&artists[0], "name").value(0), "Sophie B. Hawkins");

    // Dimensions derived from the filtered activity set: two qualifying
    // records, two users, two distinct timestamps.
    let users = read_table(&warehouse.join("tbl_users"));
    let user_ids: HashSet<String> = users
        .iter()
        .flat_map(|b| {
            let col = string_column(b, "user_id");
            (0..b.num_rows()).map(|i| col.value(i).to_string()).collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(user_ids, HashSet::from(["15".to_string(), "16".to_string()]));

    let time = read_table(&warehouse.join("tbl_time"));
    assert_eq!(time.iter().map(|b| b.num_rows()).sum::<usize>(), 2);

    let songplays = read_table(&warehouse.join("tbl_songplays"));
    assert_eq!(songplays.iter().map(|b| b.num_rows()).sum::<usize>(), 2);
}

#[tokio::test]
async fn fact_rows_join_against_the_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    run_pipeline(root).await;

    let songplays = read_table(&root.join("warehouse/tbl_songplays"));
    let batch = &songplays[0];
    assert_eq!(songplays.len(), 1);
    assert_eq!(batch.num_rows(), 2);

    let start_times = batch
        .column_by_name("start_time")
        .unwrap()
        .as_any()
        .downcast_ref::<TimestampMillisecondArray>()
        .unwrap();
    let song_ids = string_column(batch, "song_id");
    let artist_ids = string_column(batch, "artist_id");

    for i in 0..batch.num_rows() {
        if start_times.value(i) == MATCHED_TS {
            assert_eq!(song_ids.value(i), "SOSVWFT12A58A7C313");
            assert_eq!(artist_ids.value(i), "ARNF6401187FB57032");
        } else {
            assert_eq!(start_times.value(i), UNMATCHED_TS);
            assert!(song_ids.is_null(i));
            assert!(artist_ids.is_null(i));
        }
    }

    // Surrogate keys are unique and strictly increasing in read order.
    let ids = batch
        .column_by_name("songplay_id")
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(ids.values().to_vec(), vec![0, 1]);
}

#[tokio::test]
async fn time_dimension_decomposes_start_times() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    run_pipeline(root).await;

    let time = read_table(&root.join("warehouse/tbl_time"));

    let mut seen = 0;
    for batch in &time {
        let start_times = batch
            .column_by_name("start_time")
            .unwrap()
            .as_any()
            .downcast_ref::<TimestampMillisecondArray>()
            .unwrap();
        let int_col = |name: &str| {
            batch
                .column_by_name(name)
                .unwrap()
                .as_any()
                .downcast_ref::<Int32Array>()
                .unwrap()
                .clone()
        };

        for i in 0..batch.num_rows() {
            if start_times.value(i) == MATCHED_TS {
                seen += 1;
                assert_eq!(int_col("hour").value(i), 22);
                assert_eq!(int_col("day").value(i), 15);
                assert_eq!(int_col("week").value(i), 46);
                assert_eq!(int_col("month").value(i), 11);
                assert_eq!(int_col("year").value(i), 2018);
                assert_eq!(int_col("weekday").value(i), 4);
            }
        }
    }
    assert_eq!(seen, 1);

    // The fact table's start_time values are all present in tbl_time.
    let fact_times: HashSet<i64> = read_table(&root.join("warehouse/tbl_songplays"))
        .iter()
        .flat_map(|b| {
            b.column_by_name("start_time")
                .unwrap()
                .as_any()
                .downcast_ref::<TimestampMillisecondArray>()
                .unwrap()
                .values()
                .to_vec()
        })
        .collect();
    let time_times: HashSet<i64> = time
        .iter()
        .flat_map(|b| {
            b.column_by_name("start_time")
                .unwrap()
                .as_any()
                .downcast_ref::<TimestampMillisecondArray>()
                .unwrap()
                .values()
                .to_vec()
        })
        .collect();
    assert!(fact_times.is_subset(&time_times));
}

#[tokio::test]
async fn rerun_overwrites_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    run_pipeline(root).await;

    let first: Vec<String> = list_parquet(&root.join("warehouse"));
    run_pipeline(root).await;
    let second: Vec<String> = list_parquet(&root.join("warehouse"));

    assert_eq!(first, second);
}

fn list_parquet(dir: &Path) -> Vec<String> {
    let mut keys = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                keys.push(path.strip_prefix(dir).unwrap().to_string_lossy().into_owned());
            }
        }
    }
    keys.sort();
    keys
}
