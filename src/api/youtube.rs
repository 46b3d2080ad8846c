use super::PlaylistTarget;
use crate::db;
use crate::error::{Error, Result};
use crate::models::Privacy;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;
use tracing::{debug, warn};

const PLATFORM: &str = "youtube";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: i64, // epoch seconds
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// Target-side client backed by the YouTube Data API v3.
/// Google's token endpoint takes the client credentials as form fields
/// rather than a Basic authorization header. Endpoints may be overridden by
/// YOUTUBE_AUTH_BASE and YOUTUBE_API_BASE env vars (useful for tests).
pub struct YouTubeClient {
    client: Client,
    client_id: String,
    client_secret: String,
    db_path: std::path::PathBuf,
    token: tokio::sync::Mutex<Option<StoredToken>>,
}

impl YouTubeClient {
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
        env::var("YOUTUBE_AUTH_BASE").unwrap_or_else(|_| "https://oauth2.googleapis.com".into())
    }
    fn api_base() -> String {
        env::var("YOUTUBE_API_BASE")
            .unwrap_or_else(|_| "https://www.googleapis.com/youtube/v3".into())
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
                debug!("YouTube token is near expiry, refreshing");
                let mut cur = st.clone();
                self.refresh_token_internal(&mut cur).await?;
                *lock = Some(cur);
            }
        }
        Ok(())
    }

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
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ];
        let url = format!("{}/token", Self::auth_base());
        let resp = self.client.post(&url).form(&params).send().await?;
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

    /// GET, refreshing the token once on a 401 response.
    async fn get_authed(&self, url: &str) -> Result<reqwest::Response> {
        let bearer = self.get_bearer().await?;
        let resp = self
            .client
            .get(url)
            .header(AUTHORIZATION, &bearer)
            .send()
            .await?;
        if resp.status().as_u16() != 401 {
            return Ok(resp);
        }
        warn!("YouTube returned 401 for {}; refreshing token and retrying", url);
        self.force_refresh().await?;
        let bearer = self.get_bearer().await?;
        Ok(self
            .client
            .get(url)
            .header(AUTHORIZATION, &bearer)
            .send()
            .await?)
    }

    /// POST a JSON body, refreshing the token once on a 401 response.
    async fn post_authed(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response> {
        let bearer = self.get_bearer().await?;
        let resp = self
            .client
            .post(url)
            .header(AUTHORIZATION, &bearer)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;
        if resp.status().as_u16() != 401 {
            return Ok(resp);
        }
        warn!("YouTube returned 401 for {}; refreshing token and retrying", url);
        self.force_refresh().await?;
        let bearer = self.get_bearer().await?;
        Ok(self
            .client
            .post(url)
            .header(AUTHORIZATION, &bearer)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?)
    }
}

#[async_trait]
impl PlaylistTarget for YouTubeClient {
    fn name(&self) -> &str {
        YouTubeClient::name(self)
    }
    fn is_authenticated(&self) -> bool {
        YouTubeClient::is_authenticated(self)
    }

    async fn search_video(&self, query: &str) -> Result<Option<String>> {
        if !self.is_authenticated() {
            return Err(Error::not_authenticated(PLATFORM));
        }
        let url = format!(
            "{}/search?part=snippet&maxResults=1&q={}&type=video",
            Self::api_base(),
            urlencoding::encode(query)
        );
        let resp = self.get_authed(&url).await?;
        let status = resp.status();
        if !status.is_success() {
            // Best effort: a failed lookup must not block the rest of the
            // playlist, so it degrades to a miss.
            let txt = resp.text().await.unwrap_or_default();
            warn!("search for '{}' failed: {} => {}", query, status, txt);
            return Ok(None);
        }
        let j: serde_json::Value = resp.json().await?;
        let id = j["items"]
            .as_array()
            .and_then(|a| a.first())
            .and_then(|item| item["id"]["videoId"].as_str())
            .map(|s| s.to_string());
        Ok(id)
    }

    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy: Privacy,
    ) -> Result<String> {
        if !self.is_authenticated() {
            return Err(Error::not_authenticated(PLATFORM));
        }
        let url = format!("{}/playlists?part=snippet,status", Self::api_base());
        let body = json!({
            "snippet": {
                "title": title,
                "description": description
            },
            "status": {
                "privacyStatus": privacy.as_str()
            }
        });
        let resp = self.post_authed(&url, &body).await?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(Error::api(
                PLATFORM,
                format!("create playlist failed: {} => {}", status, txt),
            ));
        }
        let j: serde_json::Value = resp.json().await?;
        let id = j["id"]
            .as_str()
            .ok_or_else(|| Error::api(PLATFORM, "create playlist response missing id"))?
            .to_string();
        Ok(id)
    }

    async fn add_to_playlist(&self, playlist_id: &str, video_id: &str) -> Result<()> {
        if !self.is_authenticated() {
            return Err(Error::not_authenticated(PLATFORM));
        }
        let url = format!("{}/playlistItems?part=snippet", Self::api_base());
        let body = json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": {
                    "kind": "youtube#video",
                    "videoId": video_id
                }
            }
        });
        let resp = self.post_authed(&url, &body).await?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(Error::api(
                PLATFORM,
                format!(
                    "add video {} to playlist {} failed: {} => {}",
                    video_id, playlist_id, status, txt
                ),
            ));
        }
        Ok(())
    }

    fn playlist_url(&self, playlist_id: &str) -> String {
        format!("https://www.youtube.com/playlist?list={}", playlist_id)
    }
}
