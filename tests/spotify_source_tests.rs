use mockito::{Matcher, Server};
use rusqlite::Connection;
use serde_json::json;
use spotify_youtube_playlist_convert::api::spotify::SpotifyClient;
use spotify_youtube_playlist_convert::api::PlaylistSource;
use spotify_youtube_playlist_convert::db;
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

fn track_item(i: usize) -> serde_json::Value {
    json!({
        "track": {
            "name": format!("T{}", i),
            "artists": [{"name": format!("Artist{}", i)}]
        }
    })
}

#[test]
fn source_reader_pagination_and_extraction() {
    // Create mock server outside of any tokio runtime
    let mut server = Server::new();
    let base = server.url();
    env::set_var("SPOTIFY_API_BASE", &base);
    env::set_var("SPOTIFY_AUTH_BASE", &base);

    // Small playlist: two pages covering the extraction edge cases. The
    // second item has no embedded track (removed upstream) and the third
    // has an empty artist list.
    let page1 = json!({
        "items": [
            {"track": {"name": "Song1", "artists": [{"name": "A"}]}},
            {"track": null},
            {"track": {"name": "Song2", "artists": []}}
        ],
        "next": format!("{}/playlists/pl_small/tracks?offset=100&limit=100", base)
    });
    let page2 = json!({
        "items": [
            {"track": {"name": "Song3", "artists": [{"name": "C"}, {"name": "D"}]}}
        ],
        "next": null
    });
    let _m_small_p1 = server
        .mock("GET", "/playlists/pl_small/tracks")
        .match_query(Matcher::Exact("limit=100".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(page1.to_string())
        .create();
    let _m_small_p2 = server
        .mock("GET", "/playlists/pl_small/tracks")
        .match_query(Matcher::Exact("offset=100&limit=100".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(page2.to_string())
        .create();
    let _m_details = server
        .mock("GET", "/playlists/pl_small")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "name": "Small Mix",
                "description": "a few songs",
                "tracks": {"total": 4}
            })
            .to_string(),
        )
        .create();

    // Big playlist: three pages of 100, 100 and 37 items.
    let big_page = |offset: usize, count: usize, next: Option<String>| {
        json!({
            "items": (offset..offset + count).map(track_item).collect::<Vec<_>>(),
            "next": next
        })
    };
    let _m_big_p1 = server
        .mock("GET", "/playlists/pl_big/tracks")
        .match_query(Matcher::Exact("limit=100".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            big_page(
                0,
                100,
                Some(format!("{}/playlists/pl_big/tracks?offset=100&limit=100", base)),
            )
            .to_string(),
        )
        .create();
    let _m_big_p2 = server
        .mock("GET", "/playlists/pl_big/tracks")
        .match_query(Matcher::Exact("offset=100&limit=100".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            big_page(
                100,
                100,
                Some(format!("{}/playlists/pl_big/tracks?offset=200&limit=100", base)),
            )
            .to_string(),
        )
        .create();
    let _m_big_p3 = server
        .mock("GET", "/playlists/pl_big/tracks")
        .match_query(Matcher::Exact("offset=200&limit=100".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(big_page(200, 37, None).to_string())
        .create();

    // Prepare a temporary DB holding a valid (non-expired) token.
    let td = tempdir().unwrap();
    let db_path = td.path().join("test.db");
    let conn = Connection::open(&db_path).unwrap();
    db::run_migrations(&conn).unwrap();
    db::save_credential_raw(&conn, "spotify", &valid_token_json(), None, None).unwrap();

    let client = SpotifyClient::new("cid".into(), "csecret".into(), db_path);
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async move {
        let tracks = client.list_tracks("pl_small").await.expect("list tracks");
        // The null-track item is skipped entirely.
        assert_eq!(tracks.len(), 3);
        assert_eq!(tracks[0].artist, "A");
        assert_eq!(tracks[0].title, "Song1");
        // Empty artist list falls back to the sentinel.
        assert_eq!(tracks[1].artist, "Unknown Artist");
        assert_eq!(tracks[1].query_string(), "Unknown Artist - Song2");
        // Only the first listed artist is used.
        assert_eq!(tracks[2].artist, "C");

        // Idempotent: a second read yields the identical sequence.
        let again = client.list_tracks("pl_small").await.expect("list tracks again");
        assert_eq!(tracks, again);

        let details = client
            .get_playlist_details("pl_small")
            .await
            .expect("playlist details");
        assert_eq!(details.name, "Small Mix");
        assert_eq!(details.description, "a few songs");
        assert_eq!(details.total_tracks, 4);

        // Pagination terminates when `next` is absent, regardless of page count.
        let big = client.list_tracks("pl_big").await.expect("list big playlist");
        assert_eq!(big.len(), 237);
        assert_eq!(big[0].query_string(), "Artist0 - T0");
        assert_eq!(big[236].query_string(), "Artist236 - T236");
    });
}
