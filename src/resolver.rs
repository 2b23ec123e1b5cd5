//! Download directory selection and the add workflow.
//!
//! Suggests a show folder for TV episode releases, lets the user confirm it or pick
//! another directory, adds the torrent to Transmission and reports the result.

use std::borrow::Cow;

use thiserror::Error;

use crate::dialog::Dialog;
use crate::library::{DirectoryCandidate, DirectoryListing};
use crate::show_match;
use crate::torrent::TorrentSource;
use crate::transmission::{AddResult, RpcError, TransmissionClient};

/// Maximum number of characters of the torrent name shown in prompts.
const MAX_DISPLAY_NAME_LENGTH: usize = 50;

/// Selected download directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub label: String,
    pub path: String,
}

/// Final result of the add workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Added,
    Duplicate,
    NoResponse,
    Cancelled,
    Failed,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Could not find selected directory")]
    UnknownSelection,
}

/// Picks the download directory for a torrent using the given dialog.
pub struct Resolver<'a, D: Dialog + ?Sized> {
    dialog: &'a D,
    listing: &'a DirectoryListing,
    verbose: bool,
}

impl Outcome {
    /// Whether the process should exit with an error code.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl From<&DirectoryCandidate> for Destination {
    fn from(candidate: &DirectoryCandidate) -> Self {
        Self {
            label: candidate.label.clone(),
            path: candidate.path.clone(),
        }
    }
}

impl<'a, D: Dialog + ?Sized> Resolver<'a, D> {
    #[must_use]
    pub const fn new(dialog: &'a D, listing: &'a DirectoryListing) -> Self {
        Self {
            dialog,
            listing,
            verbose: false,
        }
    }

    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Find the existing show folder matching the torrent name.
    #[must_use]
    pub fn suggestion(&self, torrent_name: &str) -> Option<&'a DirectoryCandidate> {
        let listing = self.listing;
        let show = show_match::detect_show(torrent_name, &listing.shows)?;
        let folder = listing.shows.folder_for(show)?;
        if self.verbose {
            crate::print_verbose!("Matched show: {folder}");
        }
        listing.find_show(folder)
    }

    /// Ask the user for the download directory.
    ///
    /// Returns `Ok(None)` if the user cancelled at any point.
    ///
    /// # Errors
    /// Returns an error if the dialog returns a selection that does not exist.
    pub fn choose_destination(&self, torrent_name: &str) -> Result<Option<Destination>, ResolveError> {
        let display_name = truncate_display_name(torrent_name);

        if let Some(suggested) = self.suggestion(torrent_name) {
            match self
                .dialog
                .confirm(&format!("Add to {}?\n\n{display_name}", suggested.label))
            {
                None => return Ok(None),
                Some(true) => return Ok(Some(Destination::from(suggested))),
                Some(false) => {}
            }
        }

        let labels = self.listing.labels();
        let Some(index) = self
            .dialog
            .choose(&format!("Download directory for:\n{display_name}"), &labels, None)
        else {
            return Ok(None);
        };

        let selected = self
            .listing
            .candidates
            .get(index)
            .ok_or(ResolveError::UnknownSelection)?;

        if selected.is_create_new_show {
            return Ok(self.ask_new_show_folder(torrent_name));
        }

        Ok(Some(Destination::from(selected)))
    }

    /// Get the display name for the torrent, printing why a fallback name was used.
    pub fn torrent_name(&self, source: &TorrentSource) -> String {
        let (torrent_name, fallback_reason) = source.name_with_fallback();
        if self.verbose {
            if let Some(reason) = fallback_reason {
                crate::print_verbose!("Using fallback name: {reason}");
            }
            crate::print_verbose!("Torrent name: {torrent_name}");
        }
        torrent_name
    }

    /// Add the torrent into the chosen directory and report the result.
    pub async fn run(&self, client: &mut TransmissionClient, source: &TorrentSource) -> Outcome {
        let torrent_name = self.torrent_name(source);

        let destination = match self.choose_destination(&torrent_name) {
            Ok(Some(destination)) => destination,
            Ok(None) => return Outcome::Cancelled,
            Err(error) => {
                self.dialog.show_error(&error.to_string());
                return Outcome::Failed;
            }
        };

        if self.verbose {
            crate::print_verbose!("Destination: {}", destination.path);
        }

        let result = client.add_torrent(source, Some(&destination.path)).await;
        self.report(result, &torrent_name, &destination)
    }

    /// Show the add result to the user.
    pub fn report(
        &self,
        result: Result<AddResult, RpcError>,
        torrent_name: &str,
        destination: &Destination,
    ) -> Outcome {
        match result {
            Ok(AddResult::Added { name }) => {
                let name = name.as_deref().unwrap_or(torrent_name);
                self.dialog.show_info(&format!(
                    "✓ Torrent added!\n\n{name}\n\nDownloading to:\n{}",
                    destination.path
                ));
                Outcome::Added
            }
            Ok(AddResult::Duplicate { name }) => {
                let name = name.as_deref().unwrap_or(torrent_name);
                self.dialog
                    .show_error(&format!("Torrent already exists:\n\n{name}"));
                Outcome::Duplicate
            }
            Ok(AddResult::NoResponse) => {
                self.dialog.show_error("No response from Transmission");
                Outcome::NoResponse
            }
            Ok(AddResult::Accepted) => {
                self.dialog
                    .show_info(&format!("Torrent added to:\n{}", destination.path));
                Outcome::Added
            }
            Err(error) => {
                self.dialog.show_error(&format!(
                    "Failed to add torrent:\n\n{error}\n\nDownload directory:\n{}",
                    destination.path
                ));
                Outcome::Failed
            }
        }
    }

    fn ask_new_show_folder(&self, torrent_name: &str) -> Option<Destination> {
        let default = show_match::suggested_folder_name(torrent_name).unwrap_or_default();
        let folder = self
            .dialog
            .ask_text("Enter new TV show folder name:", &default)?;

        let folder = folder.trim();
        if folder.is_empty() {
            return None;
        }

        Some(Destination {
            label: folder.to_string(),
            path: self.listing.new_show_path(folder),
        })
    }
}

/// Shorten long torrent names for prompts.
#[must_use]
pub fn truncate_display_name(name: &str) -> Cow<'_, str> {
    if name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        let truncated: String = name.chars().take(MAX_DISPLAY_NAME_LENGTH - 3).collect();
        Cow::Owned(format!("{truncated}..."))
    } else {
        Cow::Borrowed(name)
    }
}
