//! yt-dlp argument construction for one job
//!
//! The order is part of the tool contract: ffmpeg location and destination
//! first, then the engine-wide custom flags, then the job's format selector
//! and its implied flags, output template, rate limits, and finally the URL.

use crate::config::Config;
use crate::types::JobSpec;

/// Assemble the full argument vector for one job. The URL is always last.
pub(crate) fn build_args(spec: &JobSpec, config: &Config) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(ffmpeg) = config.ffmpeg_executable() {
        args.push("--ffmpeg-location".to_string());
        args.push(ffmpeg.display().to_string());
    }

    let destination = spec.destination.as_ref().unwrap_or(&config.destination);
    args.push("-P".to_string());
    args.push(destination.display().to_string());

    args.extend(config.custom_options.iter().cloned());

    args.push("-f".to_string());
    args.push(spec.selector.clone());

    args.extend(spec.extra_args.iter().cloned());

    if let Some(items) = &spec.playlist_items {
        args.push("-I".to_string());
        args.push(items.clone());
    }

    args.push("-o".to_string());
    args.push(format!("%(title)s [{}].%(ext)s", spec.label));

    if let Some(rate) = &config.limit_rate {
        args.push("--limit-rate".to_string());
        args.push(rate.clone());
    }
    if let Some(rate) = &config.throttled_rate {
        args.push("--throttled-rate".to_string());
        args.push(rate.clone());
    }

    args.push(spec.url.clone());
    args
}
