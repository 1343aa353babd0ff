//! One-shot tool probes
//!
//! Version checks and the `-J` metadata listing. These are the only places
//! the engine waits on a whole process rather than supervising it; every
//! wait carries a deadline (a fixed short one for version checks, a
//! caller-supplied one for the listing).

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};
use crate::listing::Listing;
use crate::types::validate_url;

const VERSION_TIMEOUT: Duration = Duration::from_secs(3);

/// Run `<executable> --version` and return the reported yt-dlp version.
pub async fn ytdlp_version(executable: &Path) -> Result<String> {
    let output = run_bounded(executable, &["--version"], VERSION_TIMEOUT).await?;
    Ok(output.trim().to_string())
}

/// Run `<executable> -version` and return the reported ffmpeg version.
///
/// ffmpeg prints a banner like `ffmpeg version 6.1.1 Copyright ...`; the
/// token after `version` on the first line is the version string.
pub async fn ffmpeg_version(executable: &Path) -> Result<String> {
    let output = run_bounded(executable, &["-version"], VERSION_TIMEOUT).await?;
    let first_line = output.lines().next().unwrap_or_default();
    let version = first_line
        .split_once("version")
        .map(|(_, rest)| rest.trim())
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or("unknown");
    Ok(version.to_string())
}

/// Fetch the `-J` metadata document for one URL, bounded by `deadline`.
///
/// A hung extraction surfaces as [`Error::ProbeTimeout`] instead of
/// stalling the caller; a non-zero exit surfaces the tool's stderr via
/// [`Error::Probe`]; malformed JSON surfaces as [`Error::Parse`]. No queue
/// state is touched.
pub async fn fetch_listing(executable: &Path, url: &str, deadline: Duration) -> Result<Listing> {
    validate_url(url)?;
    debug!(url, executable = %executable.display(), "fetching listing");

    let output = run_bounded(executable, &["-J", url], deadline).await?;
    Listing::from_json(&output)
}

async fn run_bounded(executable: &Path, args: &[&str], deadline: Duration) -> Result<String> {
    let mut cmd = Command::new(executable);
    cmd.args(args);
    let output = tokio::time::timeout(deadline, cmd.output())
        .await
        .map_err(|_| Error::ProbeTimeout {
            seconds: deadline.as_secs(),
        })?
        .map_err(|source| Error::Spawn {
            executable: executable.to_path_buf(),
            source,
        })?;

    if !output.status.success() {
        return Err(Error::Probe {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
