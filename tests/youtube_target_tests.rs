use mockito::{Matcher, Server};
use rusqlite::Connection;
use serde_json::json;
use spotify_youtube_playlist_convert::api::youtube::YouTubeClient;
use spotify_youtube_playlist_convert::api::PlaylistTarget;
use spotify_youtube_playlist_convert::db;
use spotify_youtube_playlist_convert::models::Privacy;
use std::env;
use tempfile::tempdir;

fn valid_token_json() -> String {
    let now = chrono::Utc::now().timestamp();
    json!({
        "access_token": "valid",
        "token_type": "Bearer",
        "expires_at": now + 3600,
        "refresh_token": null,
        "scope": ""
    })
    .to_string()
}

#[test]
fn target_search_create_and_append_flow() {
    // Create mock server outside of any tokio runtime
    let mut server = Server::new();
    let base = server.url();
    env::set_var("YOUTUBE_API_BASE", &base);
    env::set_var("YOUTUBE_AUTH_BASE", &base);

    // Single-result search: a hit for one query, an empty result set for
    // the other.
    let _m_search_hit = server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("q".into(), "A - Song1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [
                    {"id": {"kind": "youtube#video", "videoId": "v1"}}
                ]
            })
            .to_string(),
        )
        .create();
    let _m_search_miss = server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("q".into(), "B - Song2".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "items": [] }).to_string())
        .create();

    let m_create = server
        .mock("POST", "/playlists")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": "ytpl1" }).to_string())
        .create();

    let m_add = server
        .mock("POST", "/playlistItems")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": "item1" }).to_string())
        .create();

    let td = tempdir().unwrap();
    let db_path = td.path().join("test.db");
    let conn = Connection::open(&db_path).unwrap();
    db::run_migrations(&conn).unwrap();
    db::save_credential_raw(&conn, "youtube", &valid_token_json(), None, None).unwrap();

    let client = YouTubeClient::new("cid".into(), "csecret".into(), db_path);
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async move {
        let hit = client.search_video("A - Song1").await.expect("search");
        assert_eq!(hit.as_deref(), Some("v1"));

        let miss = client.search_video("B - Song2").await.expect("search");
        assert!(miss.is_none());

        let playlist_id = client
            .create_playlist("My Mix (from Spotify)", "desc", Privacy::Private)
            .await
            .expect("create playlist");
        assert_eq!(playlist_id, "ytpl1");

        client
            .add_to_playlist(&playlist_id, "v1")
            .await
            .expect("add video");
    });

    m_create.assert();
    m_add.assert();
}
