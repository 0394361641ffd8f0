// Integration tests for session files
//
// These tests verify that records survive a save/load round trip and that
// files are named and listed chronologically.

use anyhow::Result;
use cardinal_grip::session::{Sample, SessionRecord};
use cardinal_grip::storage::{default_channel_names, SessionStore, StorageError};
use chrono::{Local, TimeZone};
use std::fs;
use tempfile::TempDir;

fn record(rows: &[(f64, &[i64])]) -> SessionRecord {
    SessionRecord::from_samples(
        rows.iter()
            .map(|(t, channels)| Sample {
                elapsed_seconds: *t,
                channels: channels.to_vec(),
            })
            .collect(),
    )
    .expect("valid record")
}

#[test]
fn test_round_trip_multi_channel() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SessionStore::new(temp_dir.path());

    let original = record(&[
        (0.0, &[1500, 2147, 2473, 2659]),
        (0.021_532_7, &[1510, 2150, 2470, 2660]),
        (0.1, &[0, 4095, 12, 3]),
        (1.000_000_000_1, &[1, 2, 3, 4]),
    ]);
    let names = default_channel_names(4);

    let path = store.save(&original, &names)?;
    let loaded = SessionStore::load_file(&path)?;

    assert_eq!(loaded.record, original);
    assert_eq!(loaded.channel_names, names);

    let text = fs::read_to_string(&path)?;
    assert_eq!(text.lines().next(), Some("time,F1,F2,F3,F4"));
    assert_eq!(text.lines().count(), 5);

    Ok(())
}

#[test]
fn test_single_channel_uses_time_s_header() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SessionStore::new(temp_dir.path());

    let original = record(&[(0.5, &[1500]), (1.25, &[1800])]);
    let path = store.save(&original, &default_channel_names(1))?;

    let text = fs::read_to_string(&path)?;
    assert_eq!(text, "time_s,force_adc\n0.5,1500\n1.25,1800\n");
    assert_eq!(SessionStore::load(&path)?, original);

    Ok(())
}

#[test]
fn test_custom_channel_names_are_preserved() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SessionStore::new(temp_dir.path());

    let names: Vec<String> = ["thumb", "index"].iter().map(|s| s.to_string()).collect();
    let path = store.save(&record(&[(0.0, &[1, 2])]), &names)?;

    assert_eq!(SessionStore::load_file(&path)?.channel_names, names);

    Ok(())
}

#[test]
fn test_file_name_encodes_timestamp_and_stays_unique() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SessionStore::new(temp_dir.path().join("data"));
    let when = Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
    let rec = record(&[(0.0, &[1])]);
    let names = default_channel_names(1);

    let first = store.save_at(&rec, &names, when)?;
    let second = store.save_at(&rec, &names, when)?;

    assert_eq!(
        first.file_name().unwrap().to_str(),
        Some("session_20250314_092653.csv")
    );
    assert_eq!(
        second.file_name().unwrap().to_str(),
        Some("session_20250314_092653_1.csv")
    );

    Ok(())
}

#[test]
fn test_list_returns_sessions_oldest_first() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SessionStore::new(temp_dir.path());
    let rec = record(&[(0.0, &[1])]);
    let names = default_channel_names(1);

    let later = Local.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();
    let earlier = Local.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
    let b = store.save_at(&rec, &names, later)?;
    let a = store.save_at(&rec, &names, earlier)?;
    fs::write(temp_dir.path().join("notes.txt"), "not a session")?;
    fs::write(temp_dir.path().join("export.csv"), "time,F1\n")?;

    assert_eq!(store.list()?, vec![a, b]);

    Ok(())
}

#[test]
fn test_list_orders_collision_suffixes_numerically() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SessionStore::new(temp_dir.path());
    let when = Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
    let rec = record(&[(0.0, &[1])]);
    let names = default_channel_names(1);

    let saved = (0..12)
        .map(|_| store.save_at(&rec, &names, when))
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(
        saved[11].file_name().unwrap().to_str(),
        Some("session_20250314_092653_11.csv")
    );
    assert_eq!(store.list()?, saved);

    Ok(())
}

#[test]
fn test_list_missing_directory_is_empty() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SessionStore::new(temp_dir.path().join("never-created"));
    assert!(store.list()?.is_empty());
    Ok(())
}

#[test]
fn test_save_rejects_empty_record_and_wrong_names() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SessionStore::new(temp_dir.path());

    assert!(matches!(
        store.save(&SessionRecord::new(), &default_channel_names(1)),
        Err(StorageError::EmptyRecord)
    ));
    assert!(matches!(
        store.save(&record(&[(0.0, &[1, 2])]), &default_channel_names(3)),
        Err(StorageError::ChannelNames {
            expected: 2,
            actual: 3
        })
    ));
    assert!(store.list()?.is_empty());

    Ok(())
}

#[test]
fn test_load_rejects_malformed_files() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path();

    let bad_header = dir.join("bad_header.csv");
    fs::write(&bad_header, "seconds,F1\n0.0,1\n")?;
    assert!(matches!(
        SessionStore::load(&bad_header),
        Err(StorageError::Format { .. })
    ));

    let no_channels = dir.join("no_channels.csv");
    fs::write(&no_channels, "time\n0.0\n")?;
    assert!(matches!(
        SessionStore::load(&no_channels),
        Err(StorageError::Format { .. })
    ));

    let bad_value = dir.join("bad_value.csv");
    fs::write(&bad_value, "time,F1\n0.0,abc\n")?;
    assert!(matches!(
        SessionStore::load(&bad_value),
        Err(StorageError::Format { .. })
    ));

    let ragged = dir.join("ragged.csv");
    fs::write(&ragged, "time,F1,F2\n0.0,1,2\n0.1,3\n")?;
    assert!(matches!(
        SessionStore::load(&ragged),
        Err(StorageError::Csv { .. })
    ));

    let backwards = dir.join("backwards.csv");
    fs::write(&backwards, "time,F1\n1.0,1\n0.5,2\n")?;
    assert!(matches!(
        SessionStore::load(&backwards),
        Err(StorageError::Record { .. })
    ));

    assert!(matches!(
        SessionStore::load(dir.join("missing.csv")),
        Err(StorageError::Csv { .. })
    ));

    Ok(())
}
