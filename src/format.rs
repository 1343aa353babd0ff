//! Format selection
//!
//! Pure derivations over a listing's [`FormatDescriptor`]s: candidate
//! partitioning for a chooser surface, combination of a video/audio pick into
//! the tool's selector string, human-readable labels for the output template,
//! and size estimation for `+`-joined selectors.

use crate::error::{Error, Result};
use crate::listing::FormatDescriptor;

/// Video candidates exposed to a chooser are capped at this many entries.
pub const VIDEO_CANDIDATE_CAP: usize = 20;
/// Audio candidates exposed to a chooser are capped at this many entries.
pub const AUDIO_CANDIDATE_CAP: usize = 15;

/// One side of a format selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChoice {
    /// Let the tool pick the best stream for this side.
    Best,
    /// A specific format id from the listing.
    Id(String),
    /// Exclude this side entirely.
    Excluded,
}

/// A video/audio pick to be turned into a selector string.
///
/// Excluding both sides is a caller error and is rejected by [`selector`]
/// before any job is created.
///
/// [`selector`]: FormatSelection::selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSelection {
    /// Video side of the pick.
    pub video: StreamChoice,
    /// Audio side of the pick.
    pub audio: StreamChoice,
}

impl FormatSelection {
    /// Combine both sides into the tool's `-f` selector string.
    ///
    /// Both sides chosen yields `"<video>+<audio>"`, one excluded side
    /// degrades to the other alone, both excluded is rejected.
    pub fn selector(&self) -> Result<String> {
        match (&self.video, &self.audio) {
            (StreamChoice::Excluded, StreamChoice::Excluded) => Err(Error::EmptySelection),
            (StreamChoice::Excluded, audio) => Ok(side(audio, "bestaudio")),
            (video, StreamChoice::Excluded) => Ok(side(video, "bestvideo")),
            (video, audio) => {
                Ok(format!("{}+{}", side(video, "bestvideo"), side(audio, "bestaudio")))
            }
        }
    }

    /// A `+`-joined selector downloads two streams that must be merged into
    /// one container.
    pub fn requires_merge(&self) -> bool {
        self.video != StreamChoice::Excluded && self.audio != StreamChoice::Excluded
    }

    /// Excluding video means the download is audio-only and the result
    /// should be extracted to an audio file.
    pub fn audio_extraction(&self) -> bool {
        self.video == StreamChoice::Excluded
    }

    /// Human-readable label for the selection, used in the output template.
    ///
    /// `"1080p+m4a"`, `"best+audio"`, or `"video only"` / `"audio only"`
    /// when one side is excluded.
    pub fn label(&self, formats: &[FormatDescriptor]) -> String {
        match (&self.video, &self.audio) {
            (StreamChoice::Excluded, _) => "audio only".to_string(),
            (_, StreamChoice::Excluded) => "video only".to_string(),
            (video, audio) => {
                let video_part = match video {
                    StreamChoice::Best => "best".to_string(),
                    StreamChoice::Id(id) => lookup(formats, id)
                        .and_then(|f| f.height)
                        .map_or_else(|| "video".to_string(), |h| format!("{h}p")),
                    StreamChoice::Excluded => unreachable!(),
                };
                let audio_part = match audio {
                    StreamChoice::Best => "audio".to_string(),
                    StreamChoice::Id(id) => lookup(formats, id)
                        .map(|f| f.ext.to_lowercase())
                        .filter(|ext| !ext.is_empty())
                        .unwrap_or_else(|| "audio".to_string()),
                    StreamChoice::Excluded => unreachable!(),
                };
                format!("{video_part}+{audio_part}")
            }
        }
    }
}

/// Subtitle track choice attached to a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtitleChoice {
    /// Embed every available track.
    All,
    /// Embed one track by language code, e.g. `"en"`.
    Language(String),
}

impl FormatSelection {
    /// Invocation flags implied by this selection and an optional subtitle
    /// choice, in the order the tool expects them after `-f`: extraction,
    /// then subtitles, then the merge container.
    pub fn download_flags(&self, subtitles: Option<&SubtitleChoice>) -> Vec<String> {
        let mut flags = Vec::new();
        if self.audio_extraction() {
            flags.extend(["-x", "--audio-format", "mp3"].map(String::from));
        }
        if let Some(choice) = subtitles {
            flags.extend(["--write-subs", "--embed-subs"].map(String::from));
            match choice {
                SubtitleChoice::All => flags.push("--all-subs".to_string()),
                SubtitleChoice::Language(code) => {
                    flags.push("--sub-lang".to_string());
                    flags.push(code.clone());
                }
            }
        }
        if self.requires_merge() {
            flags.extend(["--merge-output-format", "mp4"].map(String::from));
        }
        flags
    }
}

fn side(choice: &StreamChoice, best: &str) -> String {
    match choice {
        StreamChoice::Best => best.to_string(),
        StreamChoice::Id(id) => id.clone(),
        StreamChoice::Excluded => best.to_string(),
    }
}

fn lookup<'a>(formats: &'a [FormatDescriptor], id: &str) -> Option<&'a FormatDescriptor> {
    formats.iter().find(|f| f.format_id == id)
}

/// Video-only candidates, sorted by height descending, capped at
/// [`VIDEO_CANDIDATE_CAP`]. Streams carrying both or neither codec are
/// excluded since they cannot be combined with an audio pick.
pub fn video_candidates(formats: &[FormatDescriptor]) -> Vec<&FormatDescriptor> {
    let mut out: Vec<&FormatDescriptor> =
        formats.iter().filter(|f| f.is_video_only()).collect();
    out.sort_by(|a, b| b.height.unwrap_or(0).cmp(&a.height.unwrap_or(0)));
    out.truncate(VIDEO_CANDIDATE_CAP);
    out
}

/// Audio-only candidates, sorted by bitrate descending, capped at
/// [`AUDIO_CANDIDATE_CAP`].
pub fn audio_candidates(formats: &[FormatDescriptor]) -> Vec<&FormatDescriptor> {
    let mut out: Vec<&FormatDescriptor> =
        formats.iter().filter(|f| f.is_audio_only()).collect();
    out.sort_by(|a, b| b.abr.unwrap_or(0.0).total_cmp(&a.abr.unwrap_or(0.0)));
    out.truncate(AUDIO_CANDIDATE_CAP);
    out
}

/// Total byte size of every id a selector references.
///
/// Returns `None` when any constituent id is absent from the listing or has
/// no known size, since a partial sum would understate the download.
pub fn estimated_size(selector: &str, formats: &[FormatDescriptor]) -> Option<u64> {
    selector
        .split('+')
        .map(|id| lookup(formats, id).and_then(FormatDescriptor::size))
        .try_fold(0u64, |total, size| size.map(|s| total + s))
}

/// Render a byte count the way download sizes are usually shown.
pub fn format_bytes(bytes: u64) -> String {
    const GIB: u64 = 1024 * 1024 * 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes > GIB {
        format!("{:.1} GB", bytes as f64 / GIB as f64)
    } else if bytes > MIB {
        format!("{:.0} MB", bytes as f64 / MIB as f64)
    } else {
        format!("{:.0} KB", bytes as f64 / 1024.0)
    }
}
