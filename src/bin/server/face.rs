use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use schema_migrator::{Migrator, SchemaDocument};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone)]
pub struct AppState {
    pub migrator: Arc<Migrator>,
}

#[derive(Deserialize)]
pub struct CodeInput {
    pub code: String,
}

#[derive(Serialize)]
pub struct MigrateResponse {
    pub schema: Vec<SchemaDocument>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No 'file' part in upload")]
    MissingFile,

    #[error("Uploaded file is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::string::FromUtf8Error),

    #[error("Malformed upload: {0}")]
    Upload(#[from] axum::extract::multipart::MultipartError),

    #[error("Malformed request body: {}", .0.body_text())]
    BadJson(#[from] JsonRejection),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MissingFile | ApiError::NotUtf8(_) => StatusCode::BAD_REQUEST,
            ApiError::Upload(e) => e.status(),
            ApiError::BadJson(e) => e.status(),
        };
        let body = Json(ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            detail: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/migrate/text", post(migrate_text_handler))
        .route("/migrate/file", post(migrate_file_handler))
        .with_state(state)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

pub async fn migrate_text_handler(
    State(state): State<AppState>,
    payload: Result<Json<CodeInput>, JsonRejection>,
) -> Result<Json<MigrateResponse>, ApiError> {
    let Json(input) = payload?;
    tracing::info!(chars = input.code.len(), "POST /migrate/text");
    let schema = state.migrator.migrate(&input.code).await;
    Ok(Json(MigrateResponse { schema }))
}

async fn migrate_file_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MigrateResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let script = decode_script(field.bytes().await?.to_vec())?;
        tracing::info!(file = %file_name, chars = script.len(), "POST /migrate/file");

        let schema = state.migrator.migrate(&script).await;
        return Ok(Json(MigrateResponse { schema }));
    }
    Err(ApiError::MissingFile)
}

pub fn decode_script(bytes: Vec<u8>) -> Result<String, ApiError> {
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use tower::ServiceExt;

    const BOUNDARY: &str = "migrate-boundary";

    fn offline_state() -> AppState {
        AppState {
            migrator: Arc::new(Migrator::offline()),
        }
    }

    #[tokio::test]
    async fn test_migrate_text_wraps_single_document() {
        let input = CodeInput {
            code: "page.goto(\"https://shop.test/signup\")\npage.click(\"#submit\")".to_string(),
        };
        let Json(response) = migrate_text_handler(State(offline_state()), Ok(Json(input)))
            .await
            .unwrap();
        assert_eq!(response.schema.len(), 1);
        assert_eq!(response.schema[0].steps.len(), 2);
        assert_eq!(response.schema[0].base_url, "https://shop.test");

        let body = serde_json::to_value(MigrateResponse {
            schema: response.schema,
        })
        .unwrap();
        assert_eq!(body["schema"][0]["steps"][1]["command"]["name"], "click");
    }

    #[tokio::test]
    async fn test_migrate_text_with_nothing_recognized() {
        let input = CodeInput {
            code: "print('hello')".to_string(),
        };
        let Json(response) = migrate_text_handler(State(offline_state()), Ok(Json(input)))
            .await
            .unwrap();
        assert!(response.schema[0].steps.is_empty());
        assert_eq!(response.schema[0].base_url, "");
    }

    #[test]
    fn test_decode_script() {
        assert_eq!(decode_script(b"page.click(\"#a\")".to_vec()).unwrap(), "page.click(\"#a\")");
        let err = decode_script(vec![0xff, 0xfe]).unwrap_err();
        assert_eq!(
            err.into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_missing_file_is_bad_request() {
        assert_eq!(
            ApiError::MissingFile.into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    fn multipart(name: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{name}\"; filename=\"login.py\"\r\n\
             Content-Type: text/x-python\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::post("/migrate/file")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_json_gets_error_body() {
        let request = Request::post("/migrate/text")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"code": "#))
            .unwrap();
        let response = router(offline_state()).oneshot(request).await.unwrap();

        assert!(response.status().is_client_error());
        let body = json_body(response).await;
        assert!(body["error"].is_string());
        assert!(
            body["detail"]
                .as_str()
                .unwrap()
                .starts_with("Malformed request body")
        );
    }

    #[tokio::test]
    async fn test_text_without_json_content_type() {
        let request = Request::post("/migrate/text")
            .body(Body::from(r##"{"code": "page.click(\"#a\")"}"##))
            .unwrap();
        let response = router(offline_state()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(json_body(response).await["detail"].is_string());
    }

    #[tokio::test]
    async fn test_upload_without_file_part() {
        let response = router(offline_state())
            .oneshot(multipart("attachment", "page.click(\"#a\")"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Bad Request");
        assert_eq!(body["detail"], "No 'file' part in upload");
    }

    #[tokio::test]
    async fn test_upload_migrates_file_part() {
        let script = "page.goto(\"https://shop.test/login\")\npage.click(\"#login\")";
        let response = router(offline_state())
            .oneshot(multipart("file", script))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["schema"][0]["base_url"], "https://shop.test");
        assert_eq!(body["schema"][0]["steps"][0]["command"]["name"], "visit");
        assert_eq!(body["schema"][0]["steps"][1]["order"], 2);
    }
}
