use crate::config::ConverterConfig;
use crate::extractor::metadata::VideoInfo;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

/// Format selector handed to the tool: best audio-only stream, falling back
/// to the best combined stream when the source has no separate audio.
const FORMAT_SELECTOR: &str = "bestaudio/best";

/// Errors raised by the adapter.
#[derive(Debug)]
pub enum ExtractError {
    /// The configured binary could not be found on the system
    BinaryMissing(String),

    /// The process could not be spawned for some other reason
    Spawn(String),

    /// The tool ran but exited non-zero; carries its stderr output
    Failed(String),

    /// The metadata dump could not be parsed as JSON
    InvalidMetadata(String),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::BinaryMissing(bin) => {
                write!(f, "'{}' is not installed or not on PATH", bin)
            }
            ExtractError::Spawn(msg) => write!(f, "failed to run extractor: {}", msg),
            ExtractError::Failed(msg) => write!(f, "{}", msg),
            ExtractError::InvalidMetadata(msg) => {
                write!(f, "could not parse extractor metadata: {}", msg)
            }
        }
    }
}

impl std::error::Error for ExtractError {}

/// Thin handle around one invocation contract of the external tool.
///
/// Built per request from the current `ConverterConfig`, so runtime config
/// updates (binary path, quality target) take effect on the next call.
#[derive(Debug, Clone)]
pub struct YtDlp {
    bin: String,
    audio_quality: String,
}

impl YtDlp {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            bin: config.ytdlp_bin.clone(),
            audio_quality: config.audio_quality.clone(),
        }
    }

    /// Download the source's audio and transcode it to MP3.
    ///
    /// `output_template` is the path stem plus the tool's `%(ext)s`
    /// placeholder; the tool appends the real extension itself, so after a
    /// successful run the caller should expect `<stem>.mp3` on disk. The call
    /// blocks (in async terms: suspends) until the process finishes; there is
    /// no timeout or retry at this layer.
    pub async fn download_audio(&self, url: &str, output_template: &Path) -> Result<(), ExtractError> {
        let args = self.download_args(url, output_template);
        debug!(bin = %self.bin, ?args, "Spawning extractor for download");
        self.run(&args).await?;
        Ok(())
    }

    /// Fetch the source's metadata without downloading anything.
    pub async fn fetch_metadata(&self, url: &str) -> Result<VideoInfo, ExtractError> {
        let args = Self::metadata_args(url);
        debug!(bin = %self.bin, ?args, "Spawning extractor for metadata");
        let output = self.run(&args).await?;

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ExtractError::InvalidMetadata(e.to_string()))
    }

    fn download_args(&self, url: &str, output_template: &Path) -> Vec<String> {
        vec![
            "-f".to_string(),
            FORMAT_SELECTOR.to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            self.audio_quality.clone(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--no-progress".to_string(),
            "-o".to_string(),
            output_template.to_string_lossy().into_owned(),
            url.to_string(),
        ]
    }

    fn metadata_args(url: &str) -> Vec<String> {
        vec![
            "-J".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--quiet".to_string(),
            url.to_string(),
        ]
    }

    async fn run(&self, args: &[String]) -> Result<Output, ExtractError> {
        let output = Command::new(&self.bin)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    ExtractError::BinaryMissing(self.bin.clone())
                } else {
                    ExtractError::Spawn(e.to_string())
                }
            })?;

        if !output.status.success() {
            return Err(ExtractError::Failed(tail_of_stderr(&output.stderr)));
        }

        Ok(output)
    }
}

/// The tool can be chatty on failure; keep only the last few stderr lines,
/// which carry the actual ERROR message.
fn tail_of_stderr(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let tail_start = lines.len().saturating_sub(3);
    let tail = lines[tail_start..].join("\n");
    if tail.is_empty() {
        "extractor exited with an error and no diagnostic output".to_string()
    } else {
        tail
    }
}
