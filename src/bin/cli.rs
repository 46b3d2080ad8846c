use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use spotify_youtube_playlist_convert as lib;
use lib::api::spotify::SpotifyClient;
use lib::api::youtube::YouTubeClient;
use lib::api::{PlaylistSource, PlaylistTarget};
use lib::config::Config;
use lib::convert;
use lib::models::{ConversionRecord, Privacy};
use std::path::{Path, PathBuf};
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "spotify-youtube-playlist-convert", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which platforms have stored credentials
    Status,
    /// Authorize a platform and store tokens in DB (interactive)
    Auth {
        #[command(subcommand)]
        sub: AuthCommands,
    },
    /// List the authenticated user's Spotify playlists
    Playlists,
    /// Convert a Spotify playlist to a new YouTube playlist
    Convert {
        /// Spotify playlist id
        playlist_id: String,

        /// Title for the YouTube playlist (default: "<name> (from Spotify)")
        #[arg(long)]
        name: Option<String>,

        /// Description for the YouTube playlist
        #[arg(long)]
        description: Option<String>,

        /// Visibility of the created playlist
        #[arg(long, default_value = "private")]
        privacy: Privacy,
    },
    /// Show past conversion runs
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Drop stored credentials for a platform ("spotify" or "youtube")
    Disconnect { provider: String },
    /// Validate config file and exit
    ConfigValidate,
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Authorize Spotify and store tokens in DB (interactive)
    Spotify,
    /// Authorize YouTube and store tokens in DB (interactive)
    Youtube,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // Resolve config path: explicit --config overrides; otherwise prefer the
    // user's config dir and fall back to the repository example config for
    // local/dev usage.
    let resolved_config_path: PathBuf = match &cli.config {
        Some(p) => p.clone(),
        None => {
            let user_path = dirs::config_dir()
                .map(|d| d.join("playlist-convert/config.toml"))
                .filter(|p| p.exists());
            match user_path {
                Some(p) => p,
                None => PathBuf::from("config/example-config.toml"),
            }
        }
    };

    let cfg = Config::from_path(&resolved_config_path)
        .with_context(|| format!("loading config from {}", resolved_config_path.display()))?;

    // Initialize log->tracing bridge and structured logging.
    // Logs go to both stdout and a daily-rotated file in cfg.log_dir.
    let _ = LogTracer::init();
    let file_appender: RollingFileAppender =
        tracing_appender::rolling::daily(&cfg.log_dir, "playlist-convert.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Honor RUST_LOG if set, otherwise default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer().with_writer(non_blocking);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer);

    // Install as global default tracing subscriber without triggering
    // tracing-subscriber's internal log bridge (we already call LogTracer).
    tracing_subscriber_global::set_global_default(subscriber)
        .expect("failed to set global tracing subscriber");

    match cli.command {
        Commands::Status => {
            let db_path = cfg.db_path.clone();
            let conn = lib::db::open_or_create(&db_path)?;
            for provider in ["spotify", "youtube"] {
                let connected = lib::db::load_credential_with_client(&conn, provider)?.is_some();
                println!(
                    "{}: {}",
                    provider,
                    if connected { "connected" } else { "not connected" }
                );
            }
        }
        Commands::Auth { sub } => match sub {
            AuthCommands::Spotify => {
                lib::api::spotify_auth::run_spotify_auth(&cfg).await?;
            }
            AuthCommands::Youtube => {
                lib::api::youtube_auth::run_youtube_auth(&cfg).await?;
            }
        },
        Commands::Playlists => {
            let spotify = SpotifyClient::new(
                cfg.spotify_client_id.clone(),
                cfg.spotify_client_secret.clone(),
                cfg.db_path.clone(),
            );
            if !spotify.is_authenticated() {
                eprintln!("Spotify is not authenticated. Run `auth spotify` first.");
                std::process::exit(1);
            }
            let playlists = spotify
                .list_user_playlists()
                .await
                .with_context(|| "listing Spotify playlists".to_string())?;
            println!("Found {} playlist(s):", playlists.len());
            for pl in playlists {
                println!("- {} | {} track(s) | id: {}", pl.name, pl.total_tracks, pl.id);
            }
        }
        Commands::Convert {
            playlist_id,
            name,
            description,
            privacy,
        } => {
            let spotify = SpotifyClient::new(
                cfg.spotify_client_id.clone(),
                cfg.spotify_client_secret.clone(),
                cfg.db_path.clone(),
            );
            let youtube = YouTubeClient::new(
                cfg.youtube_client_id.clone(),
                cfg.youtube_client_secret.clone(),
                cfg.db_path.clone(),
            );

            // Mirror the conversion flow end to end: details for naming and
            // history, tracks, then the builder.
            let details = spotify
                .get_playlist_details(&playlist_id)
                .await
                .with_context(|| format!("fetching details of playlist {}", playlist_id))?;
            let tracks = spotify
                .list_tracks(&playlist_id)
                .await
                .with_context(|| format!("fetching tracks of playlist {}", playlist_id))?;
            println!(
                "Converting '{}' ({} track(s) on Spotify, {} convertible)...",
                details.name,
                details.total_tracks,
                tracks.len()
            );

            let title = name.unwrap_or_else(|| format!("{} (from Spotify)", details.name));
            let description = description.unwrap_or_else(|| {
                format!(
                    "Converted from Spotify playlist. Original had {} tracks.",
                    tracks.len()
                )
            });

            let result =
                convert::convert_playlist(&youtube, &title, &tracks, &description, privacy)
                    .await?;

            println!();
            println!(
                "Done: {} of {} track(s) added to '{}'.",
                result.added_count, result.total_songs, title
            );
            if !result.failed_songs.is_empty() {
                println!("Could not convert {} track(s):", result.failed_songs.len());
                for song in &result.failed_songs {
                    println!("- {}", song);
                }
            }
            println!("Playlist URL: {}", youtube.playlist_url(&result.target_playlist_id));

            let record = ConversionRecord {
                id: uuid::Uuid::new_v4().to_string(),
                created_at: chrono::Utc::now().timestamp(),
                source_playlist_id: playlist_id.clone(),
                source_playlist_name: details.name.clone(),
                target_playlist_id: result.target_playlist_id.clone(),
                total_songs: result.total_songs,
                added_count: result.added_count,
                failed_songs: result.failed_songs.clone(),
            };
            let db_path = cfg.db_path.clone();
            tokio::task::spawn_blocking(move || -> lib::Result<()> {
                let conn = lib::db::open_or_create(&db_path)?;
                lib::db::record_conversion(&conn, &record)?;
                Ok(())
            })
            .await??;
        }
        Commands::History { limit } => {
            let conn = lib::db::open_or_create(&cfg.db_path)?;
            let records = lib::db::list_conversions(&conn, limit)?;
            if records.is_empty() {
                println!("No conversions recorded yet.");
            }
            for rec in records {
                println!(
                    "{} | '{}' -> {} | {}/{} added, {} failed",
                    rec.id,
                    rec.source_playlist_name,
                    rec.target_playlist_id,
                    rec.added_count,
                    rec.total_songs,
                    rec.failed_songs.len()
                );
            }
        }
        Commands::Disconnect { provider } => {
            let provider = provider.to_ascii_lowercase();
            if provider != "spotify" && provider != "youtube" {
                eprintln!(
                    "Unknown provider '{}'. Expected 'spotify' or 'youtube'.",
                    provider
                );
                std::process::exit(1);
            }
            let conn = lib::db::open_or_create(&cfg.db_path)?;
            if lib::db::delete_credential(&conn, &provider)? {
                println!("Removed stored credentials for {}.", provider);
            } else {
                println!("No stored credentials for {}.", provider);
            }
        }
        Commands::ConfigValidate => {
            match Config::from_path(Path::new(&resolved_config_path)) {
                Ok(_) => println!("OK"),
                Err(e) => {
                    eprintln!("Config validation failed: {}", e);
                    std::process::exit(2);
                }
            }
        }
    }

    Ok(())
}
