use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error surface of the conversion library.
///
/// Only two conditions are fatal to a conversion request: a missing
/// authenticated client handle and a failed playlist-container creation.
/// Everything else that goes wrong inside the per-track loop is folded into
/// the `failed_songs` bookkeeping of the final result instead of being
/// surfaced here.
#[derive(Debug, Error)]
pub enum Error {
    /// No usable credentials for the named platform. Raised before any
    /// network call is made.
    #[error("not authenticated with {platform}")]
    NotAuthenticated { platform: String },

    /// Creating the target playlist container failed. Fatal: without a
    /// container there is no usable partial state.
    #[error("playlist creation failed: {0}")]
    PlaylistCreation(String),

    /// Non-success response from a platform API.
    #[error("{platform} api error: {message}")]
    Api { platform: String, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Db(#[from] rusqlite::Error),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn not_authenticated(platform: &str) -> Self {
        Error::NotAuthenticated {
            platform: platform.to_string(),
        }
    }

    pub(crate) fn api(platform: &str, message: impl Into<String>) -> Self {
        Error::Api {
            platform: platform.to_string(),
            message: message.into(),
        }
    }
}
