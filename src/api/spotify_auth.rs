use crate::api::spotify::{SpotifyClient, StoredToken};
use crate::config::Config;
use crate::db;
use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;
use url::Url;

/// Manual OAuth authorization-code helper for Spotify:
/// 1. Build the authorization URL and print it.
/// 2. User opens it in a browser, approves and gets redirected.
/// 3. User pastes the full redirect URL back into the CLI.
/// 4. The `code` param is exchanged for access + refresh tokens.
/// 5. The tokens are stored in the DB credentials table as JSON.
///
/// This avoids running an embedded HTTP server and works well for one-time
/// setup. The read-only scopes are all the Source Reader needs.
const SCOPES: &str = "playlist-read-private playlist-read-collaborative";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: i64,
    refresh_token: Option<String>,
    scope: Option<String>,
}

fn prompt_line(label: &str) -> Result<String> {
    println!("{}", label);
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

pub async fn run_spotify_auth(cfg: &Config) -> Result<()> {
    let client_id = if cfg.spotify_client_id.is_empty() {
        prompt_line("Enter your Spotify client_id:")?
    } else {
        cfg.spotify_client_id.clone()
    };
    if client_id.is_empty() {
        return Err(anyhow!("no client_id provided"));
    }
    let client_secret = if cfg.spotify_client_secret.is_empty() {
        prompt_line("Enter your Spotify client_secret:")?
    } else {
        cfg.spotify_client_secret.clone()
    };
    if client_secret.is_empty() {
        return Err(anyhow!("no client_secret provided"));
    }
    let redirect_uri = cfg.spotify_redirect_uri.clone();

    let mut url = Url::parse(&format!("{}/authorize", SpotifyClient::auth_base()))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &client_id)
        .append_pair("scope", SCOPES)
        .append_pair("redirect_uri", &redirect_uri)
        .append_pair("show_dialog", "true");

    println!(
        "Open this URL in your browser and authorize the application:\n\n{}\n",
        url
    );
    println!("After authorizing, you'll be redirected to your redirect URI.");
    let pasted = prompt_line("Paste the full redirect URL here:")?;
    let parsed = Url::parse(&pasted).map_err(|e| anyhow!("invalid url pasted: {}", e))?;
    let code = parsed
        .query_pairs()
        .find(|(k, _)| k == "code")
        .ok_or_else(|| anyhow!("no code in redirect URL"))?
        .1
        .into_owned();

    // Exchange code for tokens
    let client = Client::new();
    let params = [
        ("grant_type", "authorization_code"),
        ("code", &code),
        ("redirect_uri", &redirect_uri),
    ];
    let auth_header = format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{}:{}", client_id, client_secret))
    );
    let resp = client
        .post(format!("{}/api/token", SpotifyClient::auth_base()))
        .header("Authorization", auth_header)
        .form(&params)
        .send()
        .await?;
    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        return Err(anyhow!("token exchange failed: {} => {}", status, txt));
    }

    let tr: TokenResponse = resp.json().await?;
    let stored = StoredToken {
        access_token: tr.access_token,
        token_type: tr.token_type,
        expires_at: chrono::Utc::now().timestamp() + tr.expires_in,
        refresh_token: tr.refresh_token,
        scope: tr.scope,
    };
    let token_json = serde_json::to_string(&stored)?;
    let db_path = cfg.db_path.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let conn = db::open_or_create(&db_path)?;
        db::save_credential_raw(
            &conn,
            "spotify",
            &token_json,
            Some(&client_id),
            Some(&client_secret),
        )?;
        Ok(())
    })
    .await??;

    info!("Spotify tokens saved to DB for provider 'spotify'");
    println!("Saved Spotify tokens. You can now list playlists and convert.");
    Ok(())
}
