use crate::api::pkce;
use crate::api::youtube::{StoredToken, YouTubeClient};
use crate::config::Config;
use crate::db;
use anyhow::{anyhow, Result};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;
use url::Url;

/// Manual OAuth authorization-code helper for YouTube (Google). Same
/// paste-the-redirect-URL flow as the Spotify helper, with two Google
/// specifics: a PKCE S256 challenge, and `access_type=offline` so the
/// exchange yields a refresh token. The pasted redirect's `state` is checked
/// against the one we generated.
const SCOPES: &str = "https://www.googleapis.com/auth/youtube.force-ssl";
const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

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

fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

pub async fn run_youtube_auth(cfg: &Config) -> Result<()> {
    let client_id = if cfg.youtube_client_id.is_empty() {
        prompt_line("Enter your YouTube (Google) client_id:")?
    } else {
        cfg.youtube_client_id.clone()
    };
    if client_id.is_empty() {
        return Err(anyhow!("no client_id provided"));
    }
    let client_secret = if cfg.youtube_client_secret.is_empty() {
        prompt_line("Enter your YouTube (Google) client_secret:")?
    } else {
        cfg.youtube_client_secret.clone()
    };
    if client_secret.is_empty() {
        return Err(anyhow!("no client_secret provided"));
    }
    let redirect_uri = cfg.youtube_redirect_uri.clone();

    let verifier = pkce::generate_code_verifier();
    let challenge = pkce::code_challenge_s256(&verifier);
    let state = random_state();

    let mut url = Url::parse(AUTHORIZE_URL)?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &client_id)
        .append_pair("redirect_uri", &redirect_uri)
        .append_pair("scope", SCOPES)
        .append_pair("access_type", "offline")
        .append_pair("include_granted_scopes", "true")
        .append_pair("prompt", "consent")
        .append_pair("state", &state)
        .append_pair("code_challenge", &challenge)
        .append_pair("code_challenge_method", "S256");

    println!(
        "Open this URL in your browser and authorize the application:\n\n{}\n",
        url
    );
    println!("After authorizing, you'll be redirected to your redirect URI.");
    let pasted = prompt_line("Paste the full redirect URL here:")?;
    let parsed = Url::parse(&pasted).map_err(|e| anyhow!("invalid url pasted: {}", e))?;

    let returned_state = parsed
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned());
    if returned_state.as_deref() != Some(state.as_str()) {
        return Err(anyhow!("state mismatch in redirect URL"));
    }
    let code = parsed
        .query_pairs()
        .find(|(k, _)| k == "code")
        .ok_or_else(|| anyhow!("no code in redirect URL"))?
        .1
        .into_owned();

    // Exchange code for tokens. Google takes the client credentials and the
    // PKCE verifier as form fields.
    let client = Client::new();
    let params = [
        ("grant_type", "authorization_code"),
        ("code", &code),
        ("redirect_uri", &redirect_uri),
        ("client_id", &client_id),
        ("client_secret", &client_secret),
        ("code_verifier", &verifier),
    ];
    let resp = client
        .post(format!("{}/token", YouTubeClient::auth_base()))
        .form(&params)
        .send()
        .await?;
    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        return Err(anyhow!("token exchange failed: {} => {}", status, txt));
    }

    let tr: TokenResponse = resp.json().await?;
    if tr.refresh_token.is_none() {
        println!("Warning: no refresh token returned; you may need to revoke access and re-authorize.");
    }
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
            "youtube",
            &token_json,
            Some(&client_id),
            Some(&client_secret),
        )?;
        Ok(())
    })
    .await??;

    info!("YouTube tokens saved to DB for provider 'youtube'");
    println!("Saved YouTube tokens. You can now convert playlists.");
    Ok(())
}
