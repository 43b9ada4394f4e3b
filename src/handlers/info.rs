//! Metadata endpoint: looks up a video's details without downloading it.
//! Unlike /convert, the URL arrives as a query parameter.

use crate::error::{AppError, AppResult};
use crate::extractor::YtDlp;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    pub url: Option<String>,
}

/// GET /info?url=https://...
pub async fn video_info(
    state: web::Data<AppState>,
    query: web::Query<InfoQuery>,
) -> AppResult<HttpResponse> {
    let url = query
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::InvalidInput("No URL provided".to_string()))?;

    info!(url = %url, "Getting video info");

    let converter = YtDlp::new(&state.get_config().converter);
    let video_info = converter.fetch_metadata(url).await.map_err(|e| {
        error!(url = %url, error = %e, "Metadata extraction failed");
        AppError::ExtractionError(e.to_string())
    })?;

    Ok(HttpResponse::Ok().json(video_info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use actix_web::{test, App};

    fn test_state() -> AppState {
        let mut config = AppConfig::default();
        config.converter.ytdlp_bin = "/nonexistent/yt-dlp-test-binary".to_string();
        AppState::new(config)
    }

    #[actix_web::test]
    async fn test_missing_url_returns_400() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .route("/info", web::get().to(video_info)),
        )
        .await;

        let req = test::TestRequest::get().uri("/info").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "No URL provided");
    }

    #[actix_web::test]
    async fn test_extractor_failure_returns_500() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .route("/info", web::get().to(video_info)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/info?url=https%3A%2F%2Fexample.com%2Fwatch%3Fv%3Dabc")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 500);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(!body["error"].as_str().unwrap().is_empty());
        assert_eq!(body["kind"], "extraction_error");
    }
}
