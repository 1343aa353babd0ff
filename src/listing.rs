//! Serde model of the tool's `-J` metadata document
//!
//! `yt-dlp -J <url>` prints a single JSON object describing either one video
//! or a playlist. Only the fields this engine consumes are modeled; unknown
//! fields are ignored by serde. All fields are optional or defaulted because
//! extractors vary wildly in what they populate.

use std::collections::BTreeMap;

use serde::Deserialize;

/// One downloadable stream variant from the `formats` array.
#[derive(Debug, Clone, Deserialize)]
pub struct FormatDescriptor {
    /// Identifier unique within this listing, e.g. `"137"`.
    pub format_id: String,
    /// Container extension, e.g. `"mp4"`, `"m4a"`.
    #[serde(default)]
    pub ext: String,
    /// Video codec, or `"none"` for audio-only streams.
    pub vcodec: Option<String>,
    /// Audio codec, or `"none"` for video-only streams.
    pub acodec: Option<String>,
    /// Rendered resolution, e.g. `"1920x1080"` or `"audio only"`.
    pub resolution: Option<String>,
    /// Vertical resolution in pixels.
    pub height: Option<u32>,
    /// Frame rate.
    pub fps: Option<f64>,
    /// Audio bitrate in kbps.
    pub abr: Option<f64>,
    /// Exact size in bytes, when the extractor knows it.
    pub filesize: Option<u64>,
    /// Estimated size in bytes, when only an estimate is available.
    pub filesize_approx: Option<u64>,
}

impl FormatDescriptor {
    fn has_video(&self) -> bool {
        self.vcodec.as_deref().is_some_and(|c| c != "none")
    }

    fn has_audio(&self) -> bool {
        self.acodec.as_deref().is_some_and(|c| c != "none")
    }

    /// Stream carries video and no audio, so it can pair with an audio-only
    /// stream via a `+` selector.
    pub fn is_video_only(&self) -> bool {
        self.has_video() && !self.has_audio()
    }

    /// Stream carries audio and no video.
    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && !self.has_video()
    }

    /// Byte size, preferring the exact figure over the estimate.
    pub fn size(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }
}

/// One entry of a playlist's `entries` array.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingEntry {
    /// Entry title.
    pub title: Option<String>,
    /// Duration in seconds.
    pub duration: Option<f64>,
    /// Uploader or channel name.
    pub uploader: Option<String>,
}

/// Parsed `-J` document for a single video or a playlist.
#[derive(Debug, Clone, Deserialize)]
pub struct Listing {
    /// Video or playlist title.
    pub title: Option<String>,
    /// Duration in seconds (absent for playlists).
    pub duration: Option<f64>,
    /// Uploader or channel name.
    pub uploader: Option<String>,
    /// Upload date as `YYYYMMDD`.
    pub upload_date: Option<String>,
    /// View count, when the extractor exposes it.
    pub view_count: Option<u64>,
    /// Like count, when the extractor exposes it.
    pub like_count: Option<u64>,
    /// Thumbnail URL.
    pub thumbnail: Option<String>,
    /// Available stream variants. Empty for playlist documents.
    #[serde(default)]
    pub formats: Vec<FormatDescriptor>,
    /// Manually authored subtitle tracks, keyed by language code.
    #[serde(default)]
    pub subtitles: BTreeMap<String, serde_json::Value>,
    /// Auto-generated caption tracks, keyed by language code.
    #[serde(default)]
    pub automatic_captions: BTreeMap<String, serde_json::Value>,
    /// Per-item metadata when the URL resolves to a playlist.
    pub entries: Option<Vec<ListingEntry>>,
}

impl Listing {
    /// Parse one `-J` document from the tool's stdout.
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Whether this document describes a playlist rather than one video.
    pub fn is_playlist(&self) -> bool {
        self.entries.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// Available subtitle language codes, manual tracks first (sorted),
    /// then auto captions for languages without a manual track.
    pub fn subtitle_languages(&self) -> Vec<String> {
        let mut langs: Vec<String> = self.subtitles.keys().cloned().collect();
        langs.extend(
            self.automatic_captions
                .keys()
                .filter(|code| !self.subtitles.contains_key(*code))
                .cloned(),
        );
        langs
    }
}
