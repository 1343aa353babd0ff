//! Batch submission of selected playlist entries
//!
//! A playlist download is one aggregate job, not one job per entry: the
//! selected 1-based indices travel as a single `-I "i,j,k"` argument and
//! the entries' displayed statuses move in lockstep with the one job.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::listing::Listing;
use crate::types::{JobId, JobSpec, JobStatus};

use super::DownloadEngine;

/// Quality ceiling applied to every selected entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistQuality {
    /// Best available quality, preferring an mp4/m4a pairing.
    Best,
    /// Best available capped at this vertical resolution.
    MaxHeight(u32),
}

impl PlaylistQuality {
    /// The tool's selector expression for this ceiling.
    pub fn selector(&self) -> String {
        match self {
            PlaylistQuality::Best => {
                "bv*[ext=mp4]+ba[ext=m4a]/b[ext=mp4] / bv*+ba/b".to_string()
            }
            PlaylistQuality::MaxHeight(h) => format!(
                "bv*[height<={h}][ext=mp4]+ba[ext=m4a]/b[height<={h}][ext=mp4] \
                 / bv*[height<={h}]+ba/b[height<={h}]"
            ),
        }
    }

    fn label(&self) -> String {
        match self {
            PlaylistQuality::Best => "best".to_string(),
            PlaylistQuality::MaxHeight(h) => format!("{h}p"),
        }
    }
}

/// One playlist entry with its selection flag and displayed status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistEntry {
    /// Entry title, or a placeholder when the extractor gave none.
    pub title: String,
    /// Duration in seconds.
    pub duration: Option<f64>,
    /// Uploader or channel name.
    pub uploader: Option<String>,
    /// Whether this entry is part of the next batch download.
    pub selected: bool,
    /// Displayed status, updated in lockstep with the aggregate job.
    pub status: JobStatus,
}

/// The entries of one playlist URL, with selection state.
#[derive(Debug, Clone)]
pub struct PlaylistBatch {
    url: String,
    entries: Vec<PlaylistEntry>,
}

impl PlaylistBatch {
    /// Build a batch from an analyzed listing. Every entry starts
    /// unselected.
    pub fn from_listing(url: impl Into<String>, listing: &Listing) -> Self {
        let entries = listing
            .entries
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|e| PlaylistEntry {
                title: e.title.clone().unwrap_or_else(|| "Unknown".to_string()),
                duration: e.duration,
                uploader: e.uploader.clone(),
                selected: false,
                status: JobStatus::Pending,
            })
            .collect();
        Self {
            url: url.into(),
            entries,
        }
    }

    /// The playlist URL this batch belongs to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// All entries in playlist order.
    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    /// Select or deselect one entry by 0-based position.
    pub fn set_selected(&mut self, index: usize, selected: bool) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.selected = selected;
        }
    }

    /// Select every entry.
    pub fn select_all(&mut self) {
        for entry in &mut self.entries {
            entry.selected = true;
        }
    }

    /// Deselect every entry.
    pub fn deselect_all(&mut self) {
        for entry in &mut self.entries {
            entry.selected = false;
        }
    }

    /// 1-based indices of the selected entries, in playlist order.
    pub fn selected_indices(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.selected)
            .map(|(i, _)| i + 1)
            .collect()
    }

    /// Build the single aggregate job spec for the selected entries.
    ///
    /// Fails with `NoEntriesSelected` when nothing is selected.
    pub fn build_spec(&self, quality: PlaylistQuality) -> Result<JobSpec> {
        let indices = self.selected_indices();
        if indices.is_empty() {
            return Err(Error::NoEntriesSelected);
        }
        let items = indices
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let mut spec = JobSpec::new(self.url.clone(), quality.selector())?
            .with_label(quality.label())
            .with_extra_args(["--merge-output-format", "mp4"]);
        spec.playlist_items = Some(items);
        Ok(spec)
    }

    /// Apply the aggregate job's terminal status to every selected entry.
    pub fn apply_terminal_status(&mut self, status: &JobStatus) {
        for entry in self.entries.iter_mut().filter(|e| e.selected) {
            entry.status = status.clone();
        }
    }
}

impl DownloadEngine {
    /// Enqueue the selected entries of a playlist as one aggregate job.
    pub async fn download_playlist(
        &self,
        batch: &PlaylistBatch,
        quality: PlaylistQuality,
    ) -> Result<JobId> {
        let spec = batch.build_spec(quality)?;
        self.add_job(spec).await
    }
}
