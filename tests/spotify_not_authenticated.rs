use mockito::{Matcher, Server};
use spotify_youtube_playlist_convert::api::spotify::SpotifyClient;
use spotify_youtube_playlist_convert::api::PlaylistSource;
use spotify_youtube_playlist_convert::db;
use spotify_youtube_playlist_convert::Error;
use std::env;
use tempfile::tempdir;

/// An unauthenticated client must fail fast without touching the network.
#[test]
fn unauthenticated_source_performs_no_network_calls() {
    let mut server = Server::new();
    let base = server.url();
    env::set_var("SPOTIFY_API_BASE", &base);
    env::set_var("SPOTIFY_AUTH_BASE", &base);

    // Trap every request; the test asserts zero hits.
    let m_any = server.mock("GET", Matcher::Any).expect(0).create();

    let td = tempdir().unwrap();
    let db_path = td.path().join("test.db");

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        // No client credentials at all.
        let client = SpotifyClient::new(String::new(), String::new(), db_path.clone());
        let err = client.list_tracks("pl1").await.unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated { .. }));
        let err = client.get_playlist_details("pl1").await.unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated { .. }));
        let err = client.list_user_playlists().await.unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated { .. }));

        // Credentials configured but no token ever stored: still rejected
        // before any request goes out.
        let conn = rusqlite::Connection::open(&db_path).unwrap();
        db::run_migrations(&conn).unwrap();
        let client = SpotifyClient::new("cid".into(), "csecret".into(), db_path.clone());
        let err = client.list_tracks("pl1").await.unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated { .. }));
    });

    m_any.assert();
}
