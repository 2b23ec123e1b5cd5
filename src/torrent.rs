//! Torrent source handling and display name extraction.
//!
//! A torrent is given either as a magnet link or as a path to a `.torrent` file.
//! The display name is read from the magnet `dn` parameter or from the `info.name`
//! field of the torrent metadata.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::bencode::{self, BencodeError, BencodeValue};

/// Name used for magnet links without a display name.
pub const MAGNET_PLACEHOLDER_NAME: &str = "Magnet link";

const MAGNET_SCHEME: &str = "magnet:";

/// Torrent to add, either a magnet link or a `.torrent` file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorrentSource {
    Magnet(String),
    FileReference(PathBuf),
}

/// Why the display name fell back to the file stem or placeholder.
#[derive(Debug, Error)]
pub enum NameFallbackReason {
    #[error("failed to read torrent file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse torrent file: {0}")]
    Parse(#[from] BencodeError),

    #[error("torrent metadata has no name")]
    MissingName,

    #[error("magnet link has no display name")]
    MissingDisplayName,
}

impl TorrentSource {
    /// Create a source from user input.
    ///
    /// Anything starting with `magnet:` is treated as a magnet link, everything else as a file path.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.starts_with(MAGNET_SCHEME) {
            Self::Magnet(input.to_string())
        } else {
            Self::FileReference(PathBuf::from(input))
        }
    }

    #[must_use]
    pub const fn is_magnet(&self) -> bool {
        matches!(self, Self::Magnet(_))
    }

    /// Get a human-readable name for this torrent.
    ///
    /// Never fails: falls back to a placeholder for magnet links
    /// and to the file stem for unreadable or malformed torrent files.
    #[must_use]
    pub fn extract_name(&self) -> String {
        self.name_with_fallback().0
    }

    /// Get the display name and the reason a fallback name was used, if any.
    #[must_use]
    pub fn name_with_fallback(&self) -> (String, Option<NameFallbackReason>) {
        match self {
            Self::Magnet(uri) => magnet_display_name(uri).map_or_else(
                || {
                    (
                        MAGNET_PLACEHOLDER_NAME.to_string(),
                        Some(NameFallbackReason::MissingDisplayName),
                    )
                },
                |name| (name, None),
            ),
            Self::FileReference(path) => match metadata_name_from_file(path) {
                Ok(name) => (name, None),
                Err(reason) => (crate::path_to_file_stem_string(path), Some(reason)),
            },
        }
    }
}

impl fmt::Display for TorrentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Magnet(uri) => write!(f, "{uri}"),
            Self::FileReference(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Get the decoded `dn` parameter from a magnet link.
///
/// `+` is treated as a space before percent-decoding.
/// The value runs to the next `&`, so a raw `#` is part of the name.
#[must_use]
pub fn magnet_display_name(uri: &str) -> Option<String> {
    let (_, query) = uri.split_once('?')?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "dn")
        .map(|(_, value)| value.into_owned())
        .filter(|name| !name.is_empty())
}

/// Read the `info.name` field from a `.torrent` file.
///
/// # Errors
/// Returns the reason the file name fallback should be used instead.
pub fn metadata_name_from_file(path: &Path) -> Result<String, NameFallbackReason> {
    let buffer = fs::read(path)?;
    metadata_name(&buffer)
}

/// Read the `info.name` field from torrent metadata bytes.
///
/// # Errors
/// Returns the reason the file name fallback should be used instead.
pub fn metadata_name(buffer: &[u8]) -> Result<String, NameFallbackReason> {
    let root = bencode::decode_root(buffer)?;
    info_name(&root).ok_or(NameFallbackReason::MissingName)
}

/// Look up `info` -> `name` in a decoded metainfo dictionary.
#[must_use]
pub fn info_name(root: &BencodeValue) -> Option<String> {
    root.get(b"info")
        .and_then(|info| info.get(b"name"))
        .and_then(BencodeValue::to_string_lossy)
}
