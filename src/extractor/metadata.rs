use serde::{Deserialize, Serialize};

/// Read-only projection of the extractor's metadata dump.
///
/// yt-dlp emits a large JSON object; deserializing into this struct keeps only
/// the five fields the info endpoint exposes and drops everything else. Every
/// field is optional so that an absent upstream value becomes `null` in the
/// response instead of a failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    /// Duration in seconds. yt-dlp reports fractional durations for some
    /// extractors, so this is a float.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}
