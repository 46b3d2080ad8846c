use serde::{Deserialize, Serialize};

/// Artist name used when a source item carries an empty artist list.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Normalized (artist, title) pair extracted from a source playlist item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub artist: String,
    pub title: String,
}

impl TrackDescriptor {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
        }
    }

    /// Free-text query sent to the target search API, "Artist - Title".
    pub fn query_string(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

/// Source playlist metadata, used to derive the target playlist name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistDetails {
    pub name: String,
    pub description: String,
    pub total_tracks: u64,
}

/// One entry of the authenticated user's playlist library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub total_tracks: u64,
    pub image_url: Option<String>,
}

/// Target playlist visibility. The pipeline defaults to Private.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Private,
    Public,
    Unlisted,
}

impl Default for Privacy {
    fn default() -> Self {
        Privacy::Private
    }
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Private => "private",
            Privacy::Public => "public",
            Privacy::Unlisted => "unlisted",
        }
    }
}

impl std::str::FromStr for Privacy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "private" => Ok(Privacy::Private),
            "public" => Ok(Privacy::Public),
            "unlisted" => Ok(Privacy::Unlisted),
            other => Err(format!(
                "unknown privacy '{}'; expected private, public or unlisted",
                other
            )),
        }
    }
}

impl std::fmt::Display for Privacy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one conversion run.
///
/// Invariant: `added_count + failed_songs.len() == total_songs`.
/// `failed_songs` holds the "Artist - Title" query string of every track
/// that could not be matched or appended, in source playlist order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    pub target_playlist_id: String,
    pub total_songs: usize,
    pub added_count: usize,
    pub failed_songs: Vec<String>,
}

/// Persisted summary of a past conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub id: String,
    pub created_at: i64, // epoch seconds
    pub source_playlist_id: String,
    pub source_playlist_name: String,
    pub target_playlist_id: String,
    pub total_songs: usize,
    pub added_count: usize,
    pub failed_songs: Vec<String>,
}
