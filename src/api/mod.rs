pub mod spotify;
pub mod youtube;
pub mod mock;
pub mod pkce;
pub mod spotify_auth;
pub mod youtube_auth;

use crate::error::Result;
use crate::models::{PlaylistDetails, PlaylistSummary, Privacy, TrackDescriptor};

/// Read side of the pipeline: the platform a playlist is converted FROM.
/// Implementations: spotify::SpotifyClient, mock::MockSource.
#[async_trait::async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Return the platform's name (for logging, error messages, UI).
    fn name(&self) -> &str;

    /// Return true if the client holds usable credentials. Operations on an
    /// unauthenticated client fail with Error::NotAuthenticated before any
    /// network call is made.
    fn is_authenticated(&self) -> bool;

    /// All tracks of the given playlist, in playlist order. Paginates until
    /// the platform reports no further page. Items without a playable
    /// underlying track are skipped.
    async fn list_tracks(&self, playlist_id: &str) -> Result<Vec<TrackDescriptor>>;

    /// Name, description and track count of the given playlist.
    async fn get_playlist_details(&self, playlist_id: &str) -> Result<PlaylistDetails>;

    /// All playlists of the authenticated user.
    async fn list_user_playlists(&self) -> Result<Vec<PlaylistSummary>>;
}

/// Write side of the pipeline: the platform a playlist is converted TO.
/// Implementations: youtube::YouTubeClient, mock::MockTarget.
#[async_trait::async_trait]
pub trait PlaylistTarget: Send + Sync {
    fn name(&self) -> &str;

    fn is_authenticated(&self) -> bool;

    /// Single-result free-text search. Returns the top result's item id, or
    /// None when the search yields nothing. A non-success API response is
    /// logged and treated as a miss; it never aborts a conversion.
    async fn search_video(&self, query: &str) -> Result<Option<String>>;

    /// Create a new playlist container and return its id.
    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy: Privacy,
    ) -> Result<String>;

    /// Append one item to an existing playlist container.
    async fn add_to_playlist(&self, playlist_id: &str, video_id: &str) -> Result<()>;

    /// Shareable URL of a playlist container on this platform.
    fn playlist_url(&self, playlist_id: &str) -> String;
}
