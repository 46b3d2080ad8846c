use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub spotify_client_id: String,
    #[serde(default)]
    pub spotify_client_secret: String,
    #[serde(default = "default_spotify_redirect_uri")]
    pub spotify_redirect_uri: String,

    #[serde(default)]
    pub youtube_client_id: String,
    #[serde(default)]
    pub youtube_client_secret: String,
    #[serde(default = "default_youtube_redirect_uri")]
    pub youtube_redirect_uri: String,

    /// Visibility of created playlists: "private", "public" or "unlisted".
    #[serde(default = "default_privacy_status")]
    pub privacy_status: String,

    // path to database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_spotify_redirect_uri() -> String {
    "http://127.0.0.1:8888/spotify/callback".into()
}
fn default_youtube_redirect_uri() -> String {
    "http://127.0.0.1:8888/youtube/callback".into()
}
fn default_privacy_status() -> String {
    "private".into()
}
fn default_db_path() -> PathBuf {
    "/var/lib/playlist-convert/playlist-convert.db".into()
}
fn default_log_dir() -> PathBuf {
    "/var/log/playlist-convert".into()
}

impl Config {
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        Ok(cfg)
    }
}
