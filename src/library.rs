//! Media library directory listing.
//!
//! Fetches the download directory options from the `torrent-api` directory listing service
//! and turns them into the ordered list of candidates shown to the user.
//! Any failure to reach the service falls back to the configured default directories.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::show_match::ShowIndex;

/// Label of the candidate for creating a new TV show folder.
pub const NEW_SHOW_LABEL: &str = "── New TV Show Folder ──";

/// Default timeout for directory listing requests.
pub const DEFAULT_LISTING_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_MOVIES_DIR: &str = "/media/lacie/Media/Movies";
pub const DEFAULT_DOWNLOADS_DIR: &str = "/media/lacie/Downloads";
pub const DEFAULT_TV_DIR: &str = "/media/lacie/Media/TV Shows";

const MOVIES_LABEL: &str = "Movies";
const DOWNLOADS_LABEL: &str = "Downloads";
const TV_LABEL_PREFIX: &str = "TV: ";

/// A download directory option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryCandidate {
    /// Text shown to the user.
    pub label: String,
    /// Download directory path on the daemon host.
    pub path: String,
    /// Marker for the "create a new show folder" option, which has no path yet.
    pub is_create_new_show: bool,
}

/// Library directories used when the listing service is unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryPaths {
    pub movies: String,
    pub downloads: String,
    pub tv_base: String,
}

/// Where the directory listing came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingSource {
    Remote,
    /// Built-in defaults, with the reason the service could not be used.
    Fallback(String),
}

/// Download directory candidates and known show folders.
#[derive(Debug, Clone)]
pub struct DirectoryListing {
    /// Candidates in display order.
    pub candidates: Vec<DirectoryCandidate>,
    /// Normalized names of the existing show folders.
    pub shows: ShowIndex,
    /// Directory containing the show folders.
    pub tv_base: String,
    pub source: ListingSource,
}

/// Response of the `/movies` and `/downloads` endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathResponse {
    pub path: String,
}

/// Response of the `/tvshows` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TvShowsResponse {
    pub base: String,
    pub shows: Vec<String>,
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Client for the directory listing service.
#[derive(Debug)]
pub struct LibraryClient {
    client: Client,
    base_url: String,
}

impl Default for LibraryPaths {
    fn default() -> Self {
        Self {
            movies: DEFAULT_MOVIES_DIR.to_string(),
            downloads: DEFAULT_DOWNLOADS_DIR.to_string(),
            tv_base: DEFAULT_TV_DIR.to_string(),
        }
    }
}

impl DirectoryCandidate {
    fn new(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            is_create_new_show: false,
        }
    }

    fn create_new_show() -> Self {
        Self {
            label: NEW_SHOW_LABEL.to_string(),
            path: String::new(),
            is_create_new_show: true,
        }
    }
}

impl DirectoryListing {
    /// Build the listing from the service responses.
    #[must_use]
    pub fn from_remote(movies: &PathResponse, downloads: &PathResponse, tv_shows: &TvShowsResponse) -> Self {
        let mut candidates = vec![
            DirectoryCandidate::new(MOVIES_LABEL, &movies.path),
            DirectoryCandidate::new(DOWNLOADS_LABEL, &downloads.path),
            DirectoryCandidate::create_new_show(),
        ];
        candidates.extend(tv_shows.shows.iter().map(|show| {
            DirectoryCandidate::new(
                format!("{TV_LABEL_PREFIX}{show}"),
                join_library_path(&tv_shows.base, show),
            )
        }));

        Self {
            candidates,
            shows: ShowIndex::from_folders(&tv_shows.shows),
            tv_base: tv_shows.base.clone(),
            source: ListingSource::Remote,
        }
    }

    /// Build the default listing without any show folders.
    #[must_use]
    pub fn fallback(paths: &LibraryPaths, reason: impl Into<String>) -> Self {
        Self {
            candidates: vec![
                DirectoryCandidate::new(MOVIES_LABEL, &paths.movies),
                DirectoryCandidate::new(DOWNLOADS_LABEL, &paths.downloads),
                DirectoryCandidate::create_new_show(),
            ],
            shows: ShowIndex::default(),
            tv_base: paths.tv_base.clone(),
            source: ListingSource::Fallback(reason.into()),
        }
    }

    /// Candidate labels in display order.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.candidates.iter().map(|candidate| candidate.label.as_str()).collect()
    }

    /// Find the candidate for an existing show folder.
    #[must_use]
    pub fn find_show(&self, folder: &str) -> Option<&DirectoryCandidate> {
        let label = format!("{TV_LABEL_PREFIX}{folder}");
        self.candidates
            .iter()
            .find(|candidate| candidate.label.to_lowercase() == label.to_lowercase())
    }

    /// Path for a new show folder under the TV base directory.
    #[must_use]
    pub fn new_show_path(&self, folder: &str) -> String {
        join_library_path(&self.tv_base, folder)
    }

    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self.source, ListingSource::Fallback(_))
    }
}

impl LibraryClient {
    /// Create a client for the service at `host:port`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::with_base_url(format!("http://{host}:{port}"), DEFAULT_LISTING_TIMEOUT)
    }

    /// Create a client for the given base url.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch all directory options from the service.
    ///
    /// # Errors
    /// Returns an error if any of the endpoints cannot be fetched or parsed.
    pub async fn fetch(&self) -> Result<DirectoryListing> {
        let movies: PathResponse = self.get_json("movies").await?;
        let downloads: PathResponse = self.get_json("downloads").await?;
        let tv_shows: TvShowsResponse = self.get_json("tvshows").await?;
        Ok(DirectoryListing::from_remote(&movies, &downloads, &tv_shows))
    }

    /// Fetch the directory options, using the default directories if the service fails.
    pub async fn fetch_or_fallback(&self, fallback: &LibraryPaths) -> DirectoryListing {
        match self.fetch().await {
            Ok(listing) => listing,
            Err(error) => DirectoryListing::fallback(fallback, format!("{error:#}")),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, endpoint: &str) -> Result<T> {
        let url = format!("{}/{endpoint}", self.base_url);
        self.client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("Failed to fetch {url}"))?
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {url}"))
    }
}

/// Join a library directory and a child name with a forward slash.
fn join_library_path(base: &str, name: &str) -> String {
    format!("{}/{name}", base.trim_end_matches('/'))
}
