//! # Extraction/Conversion Adapter
//!
//! This module wraps the external `yt-dlp` tool behind a small typed surface.
//! The tool itself (and the ffmpeg it drives for the MP3 transcode) is treated
//! as a black box; only its configuration contract is pinned down here:
//!
//! - **Download mode**: format selector `bestaudio/best`, one post-processing
//!   stage extracting audio to MP3 at a fixed quality target, and an output
//!   template whose extension is appended by the tool, not the caller.
//! - **Metadata mode**: single-JSON dump of the source's metadata with no
//!   download and suppressed progress/warning output.

pub mod metadata;
pub mod ytdlp;

pub use metadata::VideoInfo;
pub use ytdlp::{ExtractError, YtDlp};
