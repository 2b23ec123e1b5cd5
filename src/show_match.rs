//! TV show detection from release-style torrent names.
//!
//! Matches names like `Show.Name.S01E02.1080p.WEB` against the existing show folders
//! so the episode can be suggested to the right folder.

use std::sync::LazyLock;

use regex::Regex;

/// Everything before the first `SxxEyy` episode marker.
static EPISODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)[.\s][Ss]\d{1,2}[Ee]\d{1,2}").expect("Failed to compile episode regex"));

/// Characters treated as word separators in show names.
const SEPARATORS: &[char] = &['.', '-', '_'];

/// A known show folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowEntry {
    /// Normalized name used for matching.
    pub name: String,
    /// Folder name as it exists on disk.
    pub folder: String,
}

/// Normalized show names built from the existing show folders.
///
/// Iteration order is the order the folders were added.
#[derive(Debug, Clone, Default)]
pub struct ShowIndex {
    entries: Vec<ShowEntry>,
}

impl ShowIndex {
    /// Build an index from folder names, skipping folders that normalize to an existing name.
    pub fn from_folders<I, S>(folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::default();
        for folder in folders {
            index.insert(folder.as_ref());
        }
        index
    }

    /// Add a show folder. Returns false if the normalized name already exists.
    pub fn insert(&mut self, folder: &str) -> bool {
        let name = normalize_show_name(folder);
        if name.is_empty() || self.entries.iter().any(|entry| entry.name == name) {
            return false;
        }
        self.entries.push(ShowEntry {
            name,
            folder: folder.to_string(),
        });
        true
    }

    /// Get the folder name for a normalized show name.
    #[must_use]
    pub fn folder_for(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.folder.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShowEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lower-case a show name and collapse separator runs to single spaces.
#[must_use]
pub fn normalize_show_name(name: &str) -> String {
    name.split(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Get the raw show name prefix before the episode marker.
///
/// Returns `None` if the name does not look like a TV episode release.
#[must_use]
pub fn episode_prefix(torrent_name: &str) -> Option<&str> {
    EPISODE_RE
        .captures(torrent_name)
        .and_then(|captures| captures.get(1))
        .map(|prefix| prefix.as_str())
}

/// Suggested folder name for a new show, keeping the original casing.
///
/// `Show.Name.S01E01` gives `Show Name`.
#[must_use]
pub fn suggested_folder_name(torrent_name: &str) -> Option<String> {
    episode_prefix(torrent_name)
        .map(|prefix| prefix.replace('.', " ").trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Find the known show a torrent belongs to.
///
/// An exact normalized match wins immediately.
/// Otherwise the longest prefix match in either direction is used,
/// with ties going to the show seen first.
#[must_use]
pub fn detect_show<'a>(torrent_name: &str, index: &'a ShowIndex) -> Option<&'a str> {
    let candidate = normalize_show_name(episode_prefix(torrent_name)?);
    if candidate.is_empty() {
        return None;
    }

    let mut best_match: Option<&str> = None;
    let mut best_score = 0;

    for entry in index.iter() {
        let show = entry.name.as_str();
        if candidate == show {
            return Some(show);
        }

        if candidate.starts_with(show) || show.starts_with(candidate.as_str()) {
            let score = candidate.len().min(show.len());
            if score > best_score {
                best_score = score;
                best_match = Some(show);
            }
        }
    }

    best_match
}
