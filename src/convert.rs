//! The conversion pipeline: create a target playlist container, then walk
//! the source track descriptors in order, resolving each through the target
//! search API and appending the hit. Per-track failures degrade into the
//! result's bookkeeping; only authentication and container creation abort.

use crate::api::{PlaylistSource, PlaylistTarget};
use crate::error::{Error, Result};
use crate::models::{ConversionResult, Privacy, TrackDescriptor};
use tracing::{info, warn};

/// Overrides for a conversion run. With all fields unset, the target
/// playlist title and description are derived from the source playlist.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub title: Option<String>,
    pub description: Option<String>,
    pub privacy: Privacy,
}

/// Create a playlist container on the target platform and populate it with
/// the best search match of each descriptor, in order.
///
/// Tracks are processed strictly sequentially so that `failed_songs` keeps
/// the source playlist's relative order and the result is reproducible.
/// There is no rollback: a partially populated playlist is a valid end state.
pub async fn convert_playlist(
    target: &dyn PlaylistTarget,
    title: &str,
    tracks: &[TrackDescriptor],
    description: &str,
    privacy: Privacy,
) -> Result<ConversionResult> {
    if !target.is_authenticated() {
        return Err(Error::NotAuthenticated {
            platform: target.name().to_string(),
        });
    }

    let playlist_id = match target.create_playlist(title, description, privacy).await {
        Ok(id) => id,
        Err(e @ Error::NotAuthenticated { .. }) => return Err(e),
        Err(e) => return Err(Error::PlaylistCreation(e.to_string())),
    };
    info!("created {} playlist '{}' ({})", target.name(), title, playlist_id);

    let mut added_count = 0usize;
    let mut failed_songs: Vec<String> = Vec::new();

    for track in tracks {
        let query = track.query_string();
        match target.search_video(&query).await {
            Ok(Some(video_id)) => match target.add_to_playlist(&playlist_id, &video_id).await {
                Ok(()) => {
                    added_count += 1;
                    info!("added: {}", query);
                }
                Err(e) => {
                    warn!("failed to add '{}' ({}): {}", query, video_id, e);
                    failed_songs.push(query);
                }
            },
            Ok(None) => {
                warn!("could not find: {}", query);
                failed_songs.push(query);
            }
            Err(e) => {
                // Transport errors during lookup are indistinguishable from
                // a miss by design; record the track and move on.
                warn!("search error for '{}': {}", query, e);
                failed_songs.push(query);
            }
        }
    }

    Ok(ConversionResult {
        target_playlist_id: playlist_id,
        total_songs: tracks.len(),
        added_count,
        failed_songs,
    })
}

/// One-call orchestration: read the source playlist and recreate it on the
/// target platform.
pub async fn run_conversion(
    source: &dyn PlaylistSource,
    target: &dyn PlaylistTarget,
    playlist_id: &str,
    opts: ConvertOptions,
) -> Result<ConversionResult> {
    let details = source.get_playlist_details(playlist_id).await?;
    let tracks = source.list_tracks(playlist_id).await?;

    let source_label = platform_label(source.name());
    let title = opts
        .title
        .unwrap_or_else(|| format!("{} (from {})", details.name, source_label));
    let description = opts.description.unwrap_or_else(|| {
        format!(
            "Converted from {} playlist. Original had {} tracks.",
            source_label,
            tracks.len()
        )
    });

    convert_playlist(target, &title, &tracks, &description, opts.privacy).await
}

/// "spotify" -> "Spotify", for user-facing playlist titles.
fn platform_label(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
