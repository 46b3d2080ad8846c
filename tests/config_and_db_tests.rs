use std::fs::File;
use std::io::Write;
use tempfile::tempdir;

use spotify_youtube_playlist_convert::config::Config;
use spotify_youtube_playlist_convert::db;
use spotify_youtube_playlist_convert::models::ConversionRecord;

#[test]
fn config_from_path_parses_toml_with_defaults() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("cfg.toml");
    let mut f = File::create(&cfg_path).unwrap();
    let toml = r#"
spotify_client_id = "sid"
spotify_client_secret = "ssecret"
db_path = "/tmp/test.db"
log_dir = "/tmp"
"#;
    f.write_all(toml.as_bytes()).unwrap();
    let cfg = Config::from_path(&cfg_path).expect("parse config");
    assert_eq!(cfg.spotify_client_id, "sid");
    assert_eq!(cfg.db_path.to_str().unwrap(), "/tmp/test.db");
    // omitted keys fall back to defaults
    assert_eq!(cfg.privacy_status, "private");
    assert!(cfg.youtube_client_id.is_empty());
    assert!(cfg.spotify_redirect_uri.contains("/spotify/callback"));
}

#[test]
fn run_migrations_creates_tables() {
    let td = tempdir().unwrap();
    let db_path = td.path().join("test.db");
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    db::run_migrations(&conn).expect("run migrations");
    for table in ["credentials", "conversions"] {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")
            .unwrap();
        let mut rows = stmt.query([table]).unwrap();
        assert!(
            rows.next().unwrap().is_some(),
            "{} table should exist after migrations",
            table
        );
    }
}

#[test]
fn credential_roundtrip_and_disconnect() {
    let td = tempdir().unwrap();
    let conn = db::open_or_create(&td.path().join("test.db")).unwrap();

    assert!(db::load_credential_with_client(&conn, "spotify")
        .unwrap()
        .is_none());

    db::save_credential_raw(&conn, "spotify", r#"{"access_token":"a"}"#, Some("cid"), None)
        .unwrap();
    let (json, client_id, client_secret) = db::load_credential_with_client(&conn, "spotify")
        .unwrap()
        .expect("credential saved");
    assert_eq!(json, r#"{"access_token":"a"}"#);
    assert_eq!(client_id.as_deref(), Some("cid"));
    assert!(client_secret.is_none());

    // upsert overwrites
    db::save_credential_raw(&conn, "spotify", r#"{"access_token":"b"}"#, Some("cid"), Some("cs"))
        .unwrap();
    let (json, _, client_secret) = db::load_credential_with_client(&conn, "spotify")
        .unwrap()
        .unwrap();
    assert_eq!(json, r#"{"access_token":"b"}"#);
    assert_eq!(client_secret.as_deref(), Some("cs"));

    assert!(db::delete_credential(&conn, "spotify").unwrap());
    assert!(!db::delete_credential(&conn, "spotify").unwrap());
    assert!(db::load_credential_with_client(&conn, "spotify")
        .unwrap()
        .is_none());
}

#[test]
fn conversion_history_roundtrip_newest_first() {
    let td = tempdir().unwrap();
    let conn = db::open_or_create(&td.path().join("test.db")).unwrap();

    let older = ConversionRecord {
        id: "rec-1".into(),
        created_at: 100,
        source_playlist_id: "pl1".into(),
        source_playlist_name: "Road Trip".into(),
        target_playlist_id: "yt1".into(),
        total_songs: 3,
        added_count: 2,
        failed_songs: vec!["B - Song2".into()],
    };
    let newer = ConversionRecord {
        id: "rec-2".into(),
        created_at: 200,
        source_playlist_id: "pl2".into(),
        source_playlist_name: "Focus".into(),
        target_playlist_id: "yt2".into(),
        total_songs: 1,
        added_count: 1,
        failed_songs: vec![],
    };
    db::record_conversion(&conn, &older).unwrap();
    db::record_conversion(&conn, &newer).unwrap();

    let records = db::list_conversions(&conn, 10).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "rec-2");
    assert_eq!(records[1].id, "rec-1");
    assert_eq!(records[1].failed_songs, vec!["B - Song2".to_string()]);
    assert_eq!(records[1].total_songs, 3);

    let limited = db::list_conversions(&conn, 1).unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, "rec-2");
}
