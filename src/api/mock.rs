use super::{PlaylistSource, PlaylistTarget};
use crate::error::{Error, Result};
use crate::models::{PlaylistDetails, PlaylistSummary, Privacy, TrackDescriptor};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tracing::info;

/// In-memory source used in tests and dry runs: a single playlist with a
/// fixed track sequence.
pub struct MockSource {
    playlist: PlaylistDetails,
    tracks: Vec<TrackDescriptor>,
    authenticated: bool,
}

impl MockSource {
    pub fn new(name: &str, tracks: Vec<TrackDescriptor>) -> Self {
        let playlist = PlaylistDetails {
            name: name.to_string(),
            description: String::new(),
            total_tracks: tracks.len() as u64,
        };
        Self {
            playlist,
            tracks,
            authenticated: true,
        }
    }

    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

#[async_trait]
impl PlaylistSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }
    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn list_tracks(&self, playlist_id: &str) -> Result<Vec<TrackDescriptor>> {
        if !self.authenticated {
            return Err(Error::not_authenticated("mock"));
        }
        info!("MockSource: list_tracks {}", playlist_id);
        Ok(self.tracks.clone())
    }

    async fn get_playlist_details(&self, playlist_id: &str) -> Result<PlaylistDetails> {
        if !self.authenticated {
            return Err(Error::not_authenticated("mock"));
        }
        info!("MockSource: get_playlist_details {}", playlist_id);
        Ok(self.playlist.clone())
    }

    async fn list_user_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        if !self.authenticated {
            return Err(Error::not_authenticated("mock"));
        }
        Ok(vec![PlaylistSummary {
            id: "mock-playlist".to_string(),
            name: self.playlist.name.clone(),
            total_tracks: self.playlist.total_tracks,
            image_url: None,
        }])
    }
}

/// In-memory target with a configurable query -> video id library and
/// injectable failures. Records every call so tests can assert call order
/// and absence of calls.
#[derive(Default)]
pub struct MockTarget {
    library: HashMap<String, String>,
    fail_search: HashSet<String>,
    fail_add: HashSet<String>,
    fail_create: bool,
    unauthenticated: bool,
    pub search_calls: Mutex<Vec<String>>,
    pub created: Mutex<Vec<(String, String, Privacy)>>,
    pub added: Mutex<Vec<(String, String)>>,
}

impl MockTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `query` to `video_id` on search.
    pub fn with_match(mut self, query: &str, video_id: &str) -> Self {
        self.library.insert(query.to_string(), video_id.to_string());
        self
    }

    /// Make searching for `query` return a transport error.
    pub fn failing_search(mut self, query: &str) -> Self {
        self.fail_search.insert(query.to_string());
        self
    }

    /// Make appending `video_id` fail.
    pub fn failing_add(mut self, video_id: &str) -> Self {
        self.fail_add.insert(video_id.to_string());
        self
    }

    /// Make playlist creation fail.
    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn unauthenticated(mut self) -> Self {
        self.unauthenticated = true;
        self
    }
}

#[async_trait]
impl PlaylistTarget for MockTarget {
    fn name(&self) -> &str {
        "mock"
    }
    fn is_authenticated(&self) -> bool {
        !self.unauthenticated
    }

    async fn search_video(&self, query: &str) -> Result<Option<String>> {
        self.search_calls.lock().unwrap().push(query.to_string());
        if self.fail_search.contains(query) {
            return Err(Error::api("mock", format!("injected search failure: {}", query)));
        }
        info!("MockTarget: search {}", query);
        Ok(self.library.get(query).cloned())
    }

    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy: Privacy,
    ) -> Result<String> {
        if self.fail_create {
            return Err(Error::api("mock", "injected create failure"));
        }
        info!("MockTarget: create_playlist {}", title);
        self.created
            .lock()
            .unwrap()
            .push((title.to_string(), description.to_string(), privacy));
        Ok(format!("mock-playlist-{}", title))
    }

    async fn add_to_playlist(&self, playlist_id: &str, video_id: &str) -> Result<()> {
        if self.fail_add.contains(video_id) {
            return Err(Error::api("mock", format!("injected add failure: {}", video_id)));
        }
        info!("MockTarget: add {} -> {}", video_id, playlist_id);
        self.added
            .lock()
            .unwrap()
            .push((playlist_id.to_string(), video_id.to_string()));
        Ok(())
    }

    fn playlist_url(&self, playlist_id: &str) -> String {
        format!("mock://playlist/{}", playlist_id)
    }
}
