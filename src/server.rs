//! HTTP surface: a single `POST /api/chat` endpoint

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use log::{debug, error, info};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::request::{ErrorResponse, GenerationRequest, ReplyBody};
use crate::InsightBackend;

/// Shared handler state; no backend means no API key was configured
#[derive(Clone, Default)]
pub struct AppState
{   pub backend: Option<Arc<InsightBackend>>
}

impl AppState
{   pub fn new(backend: InsightBackend) -> Self
    {   AppState { backend: Some(Arc::new(backend)) }
    }

    pub fn unconfigured() -> Self
    {   AppState { backend: None }
    }
}

pub fn router(state: AppState) -> Router
{   Router::new()
      .route("/api/chat", post(chat).fallback(method_not_allowed))
      .with_state(state)
}

/// Bind and serve until `shutdown` resolves
pub async fn serve<F>(
  bind: &str
, state: AppState
, shutdown: F
) -> Result<(), std::io::Error>
where F: std::future::Future<Output = ()> + Send + 'static
{   let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("tims-insight listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
      .with_graceful_shutdown(shutdown)
      .await
}

async fn method_not_allowed() -> Response
{   (
      StatusCode::METHOD_NOT_ALLOWED
    , [(header::ALLOW, "POST")]
    , Json(ErrorResponse::new("Method Not Allowed"))
    )
      .into_response()
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> Response
{   (status, Json(ErrorResponse::new(message))).into_response()
}

async fn chat(State(state): State<AppState>, body: Bytes) -> Response
{   let Some(backend) = state.backend.as_ref() else {
      error!("Chat request rejected: API key not configured");
      return error_reply(
        StatusCode::INTERNAL_SERVER_ERROR
      , "API key not configured"
      );
    };

    // Anything that is not a JSON object reads as an empty request.
    let request: GenerationRequest = serde_json::from_slice(&body)
      .unwrap_or_else(|e| {
        debug!("Unreadable request body: {}", e);
        GenerationRequest::default()
      });

    // Dropping the guard (client gone) cancels in-flight upstream calls.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match backend.handle_and_wait(request, cancel).await
    {   Ok(outcome) => {
          (StatusCode::OK, Json(ReplyBody::from(outcome))).into_response()
        }
      , Err(e @ Error::MissingInput) => {
          error_reply(StatusCode::BAD_REQUEST, e.to_string())
        }
      , Err(e) => {
          error!("Chat API error: {}", e);
          error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
