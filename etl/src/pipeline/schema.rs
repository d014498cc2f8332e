use arrow::datatypes::{DataType, Field, Schema, TimeUnit};

/// Arrow schemas for the five output tables. Partition columns stay in the
/// file as well as in the directory path, so every file is self-contained.

pub fn songs_schema() -> Schema {
    Schema::new(vec![
        Field::new("song_id", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, true),
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("year", DataType::Int32, false),
        Field::new("duration", DataType::Float64, true),
    ])
}

pub fn artists_schema() -> Schema {
    Schema::new(vec![
        Field::new("artist_id", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("latitude", DataType::Float64, true),
        Field::new("longitude", DataType::Float64, true),
    ])
}

pub fn users_schema() -> Schema {
    Schema::new(vec![
        Field::new("user_id", DataType::Utf8, false),
        Field::new("first_name", DataType::Utf8, true),
        Field::new("last_name", DataType::Utf8, true),
        Field::new("gender", DataType::Utf8, true),
        Field::new("level", DataType::Utf8, true),
    ])
}

pub fn time_schema() -> Schema {
    Schema::new(vec![
        Field::new(
            "start_time",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            false,
        ),
        Field::new("hour", DataType::Int32, false),
        Field::new("day", DataType::Int32, false),
        Field::new("week", DataType::Int32, false),
        Field::new("month", DataType::Int32, false),
        Field::new("year", DataType::Int32, false),
        Field::new("weekday", DataType::Int32, false),
    ])
}

pub fn songplays_schema() -> Schema {
    Schema::new(vec![
        Field::new("songplay_id", DataType::Int64, false),
        Field::new(
            "start_time",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            false,
        ),
        Field::new("user_id", DataType::Utf8, false),
        Field::new("level", DataType::Utf8, true),
        Field::new("song_id", DataType::Utf8, true),
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("session_id", DataType::Int64, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("user_agent", DataType::Utf8, true),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fact_schema_has_nine_columns() {
        let schema = songplays_schema();
        assert_eq!(schema.fields().len(), 9);
        assert!(schema.field_with_name("song_id").unwrap().is_nullable());
        assert!(schema.field_with_name("artist_id").unwrap().is_nullable());
        assert!(!schema.field_with_name("songplay_id").unwrap().is_nullable());
    }

    #[test]
    fn time_schema_keys_on_timestamp() {
        let schema = time_schema();
        assert_eq!(
            schema.field_with_name("start_time").unwrap().data_type(),
            &DataType::Timestamp(TimeUnit::Millisecond, None)
        );
    }
}
