//! Conversion endpoint: accepts a video URL, runs the download + MP3
//! transcode through the external tool, and streams the file back as an
//! attachment. The temporary output is deleted once the response body has
//! been prepared, whether or not preparation succeeded.

use crate::error::{AppError, AppResult};
use crate::extractor::YtDlp;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    /// Optional so a body without the field reaches our validation instead of
    /// being rejected by the JSON extractor with a different error shape.
    pub url: Option<String>,
}

/// POST /convert
/// Body: {"url": "https://..."}
pub async fn convert(
    state: web::Data<AppState>,
    body: web::Json<ConvertRequest>,
) -> AppResult<HttpResponse> {
    let url = body
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::InvalidInput("No URL provided".to_string()))?
        .to_string();

    info!(url = %url, "Received conversion request");

    let config = state.get_config();
    let temp_dir = PathBuf::from(&config.converter.temp_dir);

    // A fresh UUID per request is the only thing keeping concurrent
    // conversions from clobbering each other in the shared temp directory.
    let job_id = Uuid::new_v4();
    let output_template = temp_dir.join(format!("{job_id}.%(ext)s"));
    let output_path = temp_dir.join(format!("{job_id}.mp3"));
    let download_name = format!("{job_id}.mp3");

    let converter = YtDlp::new(&config.converter);

    info!(output = %output_path.display(), "Starting download and conversion");
    state.conversion_started();
    let download_result = converter.download_audio(&url, &output_template).await;

    let response = match download_result {
        Ok(()) => build_attachment(&output_path, &download_name).await,
        Err(e) => {
            error!(url = %url, error = %e, "Conversion failed");
            Err(AppError::ConversionError(e.to_string()))
        }
    };

    // A run only counts as completed once the output file has been read back
    // for the response; a nominally successful tool run with no file on disk
    // is a failure.
    state.conversion_finished(response.is_ok());

    // Runs on the error path too, in case the tool left a partial file behind.
    cleanup_output(&output_path).await;

    if response.is_ok() {
        info!(url = %url, file = %download_name, "Conversion successful, file sent");
    }
    response
}

/// Load the finished file and wrap it in an attachment response.
async fn build_attachment(path: &Path, download_name: &str) -> AppResult<HttpResponse> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            error!(path = %path.display(), "Output file not found after conversion");
            return Err(AppError::FileMissing(format!(
                "expected output file was not produced: {}",
                path.display()
            )));
        }
        Err(e) => {
            return Err(AppError::Internal(format!(
                "could not read output file: {}",
                e
            )))
        }
    };

    Ok(HttpResponse::Ok()
        .content_type("audio/mpeg")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{download_name}\""),
        ))
        .body(bytes))
}

/// Best-effort deletion of the temporary output. Failure is downgraded to a
/// warning; a leftover temp file must never turn into a client-facing error.
async fn cleanup_output(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!(path = %path.display(), "Deleted temporary file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete temporary file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use actix_web::{test, App};
    use serde_json::json;

    /// Config pointing at a per-test temp dir and a binary that cannot exist,
    /// so no test ever shells out to a real yt-dlp.
    fn test_state(temp_dir: &Path) -> AppState {
        let mut config = AppConfig::default();
        config.converter.temp_dir = temp_dir.to_string_lossy().into_owned();
        config.converter.ytdlp_bin = "/nonexistent/yt-dlp-test-binary".to_string();
        AppState::new(config)
    }

    /// Drop an executable shell script into `dir` that stands in for the
    /// external tool, so the composed handler path can run without a real
    /// yt-dlp or any network access.
    #[cfg(unix)]
    fn write_stub_tool(dir: &Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("yt-dlp-stub");
        std::fs::write(&path, script).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[cfg(unix)]
    fn stub_state(bin_dir: &Path, out_dir: &Path, script: &str) -> AppState {
        let stub = write_stub_tool(bin_dir, script);
        let mut config = AppConfig::default();
        config.converter.temp_dir = out_dir.to_string_lossy().into_owned();
        config.converter.ytdlp_bin = stub.to_string_lossy().into_owned();
        AppState::new(config)
    }

    #[actix_web::test]
    async fn test_missing_url_returns_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(dir.path())))
                .route("/convert", web::post().to(convert)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/convert")
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "No URL provided");
    }

    #[actix_web::test]
    async fn test_empty_url_returns_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(dir.path())))
                .route("/convert", web::post().to(convert)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/convert")
            .set_json(json!({"url": "   "}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_adapter_failure_returns_500_with_error_field() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/convert", web::post().to(convert)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/convert")
            .set_json(json!({"url": "https://example.com/watch?v=abc"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 500);

        let body: serde_json::Value = test::read_body_json(resp).await;
        let message = body["error"].as_str().unwrap();
        assert!(!message.is_empty());
        assert_eq!(body["kind"], "conversion_error");

        // The failure was counted and no temp file was left behind
        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.failed_conversions, 1);
        assert_eq!(snapshot.active_conversions, 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[actix_web::test]
    async fn test_successful_convert_streams_mp3_and_cleans_up() {
        let bin_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();

        // Mimics the real tool's download mode: resolves the %(ext)s
        // placeholder in the -o template and writes an mp3 there.
        let script = concat!(
            "#!/bin/sh\n",
            "out=\"\"\n",
            "prev=\"\"\n",
            "for a in \"$@\"; do\n",
            "  if [ \"$prev\" = \"-o\" ]; then out=\"$a\"; fi\n",
            "  prev=\"$a\"\n",
            "done\n",
            "target=$(printf '%s' \"$out\" | sed 's/%(ext)s$/mp3/')\n",
            "printf 'ID3stub-audio' > \"$target\"\n",
        );
        let state = stub_state(bin_dir.path(), out_dir.path(), script);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/convert", web::post().to(convert)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/convert")
            .set_json(json!({"url": "https://example.com/watch?v=abc"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let content_type = resp.headers().get("content-type").unwrap();
        assert_eq!(content_type, "audio/mpeg");
        let disposition = resp
            .headers()
            .get("content-disposition")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\""));
        assert!(disposition.ends_with(".mp3\""));

        let body = test::read_body(resp).await;
        assert_eq!(&body[..], b"ID3stub-audio");

        // The temporary file is gone once the response has been produced
        assert_eq!(std::fs::read_dir(out_dir.path()).unwrap().count(), 0);

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.completed_conversions, 1);
        assert_eq!(snapshot.failed_conversions, 0);
        assert_eq!(snapshot.active_conversions, 0);
    }

    #[cfg(unix)]
    #[actix_web::test]
    async fn test_tool_success_without_output_counts_as_failure() {
        let bin_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();

        // Tool exits 0 but never writes the file
        let state = stub_state(bin_dir.path(), out_dir.path(), "#!/bin/sh\nexit 0\n");

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/convert", web::post().to(convert)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/convert")
            .set_json(json!({"url": "https://example.com/watch?v=abc"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 500);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "file_missing");

        // A run with no file on disk must not be counted as completed
        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.completed_conversions, 0);
        assert_eq!(snapshot.failed_conversions, 1);
        assert_eq!(snapshot.active_conversions, 0);
    }

    #[actix_web::test]
    async fn test_attachment_built_from_finished_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp3");
        tokio::fs::write(&path, b"ID3fake-mp3-bytes").await.unwrap();

        let resp = build_attachment(&path, "out.mp3").await.unwrap();
        assert_eq!(resp.status(), 200);
        let content_type = resp.headers().get("content-type").unwrap();
        assert_eq!(content_type, "audio/mpeg");
        let disposition = resp.headers().get("content-disposition").unwrap();
        assert_eq!(
            disposition.to_str().unwrap(),
            "attachment; filename=\"out.mp3\""
        );
    }

    #[actix_web::test]
    async fn test_attachment_missing_file_is_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_attachment(&dir.path().join("never.mp3"), "never.mp3")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FileMissing(_)));
    }

    #[actix_web::test]
    async fn test_cleanup_removes_file_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleanup.mp3");
        tokio::fs::write(&path, b"x").await.unwrap();

        cleanup_output(&path).await;
        assert!(!path.exists());

        // Second call must be a no-op, not a panic or error
        cleanup_output(&path).await;
    }

    #[::core::prelude::v1::test]
    fn test_output_names_never_collide() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_ne!(format!("{a}.mp3"), format!("{b}.mp3"));
    }
}
