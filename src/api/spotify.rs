use super::PlaylistSource;
use crate::db;
use crate::error::{Error, Result};
use crate::models::{PlaylistDetails, PlaylistSummary, TrackDescriptor, UNKNOWN_ARTIST};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use log::{debug, warn};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;

const PLATFORM: &str = "spotify";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: i64, // epoch seconds
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// Source-side client backed by the Spotify Web API.
/// Token management reads token JSON from the DB and persists refreshed
/// tokens. Endpoints may be overridden by SPOTIFY_AUTH_BASE and
/// SPOTIFY_API_BASE env vars (useful for tests).
pub struct SpotifyClient {
    client: Client,
    client_id: String,
    client_secret: String,
    db_path: std::path::PathBuf,
    token: tokio::sync::Mutex<Option<StoredToken>>,
}

impl SpotifyClient {
    pub fn new(client_id: String, client_secret: String, db_path: std::path::PathBuf) -> Self {
        // If either client_id or client_secret is empty, try to load from DB
        let (client_id, client_secret) = if client_id.is_empty() || client_secret.is_empty() {
            if let Ok(conn) = rusqlite::Connection::open(&db_path) {
                if let Ok(Some((_token_json, db_client_id, db_client_secret))) =
                    db::load_credential_with_client(&conn, PLATFORM)
                {
                    (
                        db_client_id.unwrap_or(client_id),
                        db_client_secret.unwrap_or(client_secret),
                    )
                } else {
                    (client_id, client_secret)
                }
            } else {
                (client_id, client_secret)
            }
        } else {
            (client_id, client_secret)
        };
        Self {
            client: Client::new(),
            client_id,
            client_secret,
            db_path,
            token: tokio::sync::Mutex::new(None),
        }
    }

    fn is_authenticated(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
    fn name(&self) -> &str {
        PLATFORM
    }

    pub(crate) fn auth_base() -> String {
        env::var("SPOTIFY_AUTH_BASE").unwrap_or_else(|_| "https://accounts.spotify.com".into())
    }
    fn api_base() -> String {
        // include v1 path by default
        env::var("SPOTIFY_API_BASE").unwrap_or_else(|_| "https://api.spotify.com/v1".into())
    }

    async fn load_token_from_db(&self) -> Result<Option<StoredToken>> {
        let db_path = self.db_path.clone();
        let json_opt = tokio::task::spawn_blocking(move || -> Result<Option<String>> {
            let conn = rusqlite::Connection::open(db_path)?;
            Ok(db::load_credential_with_client(&conn, PLATFORM)?.map(|(json, _, _)| json))
        })
        .await??;

        match json_opt {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    async fn persist_token_to_db(&self, st: &StoredToken) -> Result<()> {
        let db_path = self.db_path.clone();
        let s = serde_json::to_string(st)?;
        // Pass the client credentials explicitly so the UPSERT does not
        // overwrite them with NULL on every refresh.
        let client_id = self.client_id.clone();
        let client_secret = self.client_secret.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = rusqlite::Connection::open(db_path)?;
            db::save_credential_raw(&conn, PLATFORM, &s, Some(&client_id), Some(&client_secret))?;
            Ok(())
        })
        .await??;
        Ok(())
    }

    async fn ensure_token(&self) -> Result<()> {
        let mut lock = self.token.lock().await;
        if lock.is_none() {
            if let Some(st) = self.load_token_from_db().await? {
                *lock = Some(st);
            }
        }
        if let Some(st) = &*lock {
            let now = Utc::now().timestamp();
            if now + 30 >= st.expires_at {
                debug!("Spotify token is near expiry, refreshing");
                let mut cur = st.clone();
                self.refresh_token_internal(&mut cur).await?;
                *lock = Some(cur);
            }
        }
        Ok(())
    }

    /// Refresh regardless of the stored expiry. Used after a 401 response.
    async fn force_refresh(&self) -> Result<()> {
        let mut lock = self.token.lock().await;
        let st = lock
            .as_ref()
            .ok_or_else(|| Error::not_authenticated(PLATFORM))?;
        let mut cur = st.clone();
        self.refresh_token_internal(&mut cur).await?;
        *lock = Some(cur);
        Ok(())
    }

    async fn refresh_token_internal(&self, cur: &mut StoredToken) -> Result<()> {
        let refresh_token = cur
            .refresh_token
            .clone()
            .ok_or_else(|| Error::api(PLATFORM, "no refresh token stored"))?;
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", &refresh_token),
        ];
        let auth_header = format!(
            "Basic {}",
            general_purpose::STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret))
        );
        let url = format!("{}/api/token", Self::auth_base());
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, auth_header)
            .form(&params)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::api(
                PLATFORM,
                format!("token refresh failed: {} => {}", status, body),
            ));
        }
        let j: serde_json::Value = resp.json().await?;
        let access_token = j["access_token"]
            .as_str()
            .ok_or_else(|| Error::api(PLATFORM, "token refresh response missing access_token"))?
            .to_string();
        let expires_in = j["expires_in"].as_i64().unwrap_or(3600);
        cur.access_token = access_token;
        cur.token_type = "Bearer".into();
        cur.expires_at = Utc::now().timestamp() + expires_in;
        if let Some(s) = j["scope"].as_str() {
            cur.scope = Some(s.to_string());
        }
        self.persist_token_to_db(cur).await?;
        Ok(())
    }

    async fn get_bearer(&self) -> Result<String> {
        self.ensure_token().await?;
        let lock = self.token.lock().await;
        let st = lock
            .as_ref()
            .ok_or_else(|| Error::not_authenticated(PLATFORM))?;
        Ok(format!("Bearer {}", st.access_token))
    }

    /// GET a JSON document, refreshing the token once on a 401 response.
    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let bearer = self.get_bearer().await?;
        let resp = self
            .client
            .get(url)
            .header(AUTHORIZATION, &bearer)
            .send()
            .await?;
        let resp = if resp.status().as_u16() == 401 {
            warn!("Spotify returned 401 for {}; refreshing token and retrying", url);
            self.force_refresh().await?;
            let bearer = self.get_bearer().await?;
            self.client
                .get(url)
                .header(AUTHORIZATION, &bearer)
                .send()
                .await?
        } else {
            resp
        };
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(Error::api(
                PLATFORM,
                format!("GET {} failed: {} => {}", url, status, txt),
            ));
        }
        Ok(resp.json().await?)
    }
}

/// Extract a descriptor from one raw playlist item. Returns None when the
/// embedded track is null/absent (removed or unavailable upstream).
fn descriptor_from_item(item: &serde_json::Value) -> Option<TrackDescriptor> {
    let track = &item["track"];
    if !track.is_object() {
        return None;
    }
    let artist = track["artists"]
        .as_array()
        .and_then(|a| a.first())
        .and_then(|a| a["name"].as_str())
        .unwrap_or(UNKNOWN_ARTIST)
        .to_string();
    let title = track["name"].as_str().unwrap_or("").to_string();
    Some(TrackDescriptor { artist, title })
}

#[async_trait]
impl PlaylistSource for SpotifyClient {
    fn name(&self) -> &str {
        SpotifyClient::name(self)
    }
    fn is_authenticated(&self) -> bool {
        SpotifyClient::is_authenticated(self)
    }

    async fn list_tracks(&self, playlist_id: &str) -> Result<Vec<TrackDescriptor>> {
        if !self.is_authenticated() {
            return Err(Error::not_authenticated(PLATFORM));
        }
        let mut tracks = Vec::new();
        let mut next = Some(format!(
            "{}/playlists/{}/tracks?limit=100",
            Self::api_base(),
            playlist_id
        ));
        while let Some(url) = next {
            let j = self.get_json(&url).await?;
            if let Some(items) = j["items"].as_array() {
                for it in items {
                    if let Some(td) = descriptor_from_item(it) {
                        tracks.push(td);
                    } else {
                        debug!("skipping playlist item without an embedded track");
                    }
                }
            }
            next = j["next"].as_str().map(|s| s.to_string());
        }
        Ok(tracks)
    }

    async fn get_playlist_details(&self, playlist_id: &str) -> Result<PlaylistDetails> {
        if !self.is_authenticated() {
            return Err(Error::not_authenticated(PLATFORM));
        }
        let url = format!("{}/playlists/{}", Self::api_base(), playlist_id);
        let j = self.get_json(&url).await?;
        let name = j["name"].as_str().unwrap_or("").to_string();
        let description = j["description"].as_str().unwrap_or("").to_string();
        let total_tracks = j["tracks"]["total"].as_u64().unwrap_or(0);
        Ok(PlaylistDetails {
            name,
            description,
            total_tracks,
        })
    }

    async fn list_user_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        if !self.is_authenticated() {
            return Err(Error::not_authenticated(PLATFORM));
        }
        let mut playlists = Vec::new();
        let mut next = Some(format!("{}/me/playlists?limit=50", Self::api_base()));
        while let Some(url) = next {
            let j = self.get_json(&url).await?;
            if let Some(items) = j["items"].as_array() {
                for pl in items {
                    playlists.push(PlaylistSummary {
                        id: pl["id"].as_str().unwrap_or("").to_string(),
                        name: pl["name"].as_str().unwrap_or("").to_string(),
                        total_tracks: pl["tracks"]["total"].as_u64().unwrap_or(0),
                        image_url: pl["images"]
                            .as_array()
                            .and_then(|a| a.first())
                            .and_then(|img| img["url"].as_str())
                            .map(|s| s.to_string()),
                    });
                }
            }
            next = j["next"].as_str().map(|s| s.to_string());
        }
        Ok(playlists)
    }
}
