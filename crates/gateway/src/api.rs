//! JSON API handlers: chat (buffered and streamed), raw space data, and the
//! one-shot `/ask` endpoint.

use axum::{
    Json,
    body::{Body, Bytes},
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use orbitchat_core::data::{DataCategory, FetchOutcome, FetchQuery, GeoPoint};
use orbitchat_core::error::ProviderError;
use orbitchat_core::message::{Conversation, Message};

use crate::SharedState;

// ── Types ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    /// Overrides the configured model for this request.
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

#[derive(Debug, Serialize)]
struct UnavailableResponse {
    category: DataCategory,
    available: bool,
    reason: String,
}

#[derive(Debug, Deserialize)]
pub struct DataParams {
    pub date: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct AskParams {
    pub question: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, kind: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            kind: kind.into(),
        }),
    )
}

fn bad_request(error: impl Into<String>) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "bad_request", error)
}

/// HTTP status for a chat provider failure.
pub fn provider_status(error: &ProviderError) -> StatusCode {
    match error {
        ProviderError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        ProviderError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        ProviderError::Network(_) | ProviderError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ProviderError::AuthenticationFailed(_)
        | ProviderError::MalformedResponse(_)
        | ProviderError::ApiError { .. }
        | ProviderError::StreamInterrupted(_) => StatusCode::BAD_GATEWAY,
    }
}

fn provider_error(error: ProviderError) -> ApiError {
    warn!(kind = error.kind(), error = %error, "Chat request failed");
    api_error(provider_status(&error), error.kind(), error.to_string())
}

fn conversation_from(
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<(Conversation, Option<String>), ApiError> {
    let Json(request) = payload.map_err(|e| bad_request(e.body_text()))?;
    if request.messages.is_empty() {
        return Err(bad_request("messages must not be empty"));
    }
    Ok((Conversation::from(request.messages), request.model))
}

// ── Chat ──────────────────────────────────────────────────────────────────

/// `POST /api/chat`: buffered reply.
pub async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let (conversation, model) = conversation_from(payload)?;
    let request_id = Uuid::new_v4();
    info!(%request_id, messages = conversation.len(), "Chat request");

    let reply = state
        .pipeline
        .reply(&conversation, model.as_deref())
        .await
        .map_err(provider_error)?;

    info!(%request_id, reply_len = reply.len(), "Chat reply sent");
    Ok(Json(ChatResponse { reply }))
}

/// `POST /api/chat/stream`: fragments are written to the body as they arrive.
///
/// Failures before the first fragment are reported as a JSON error. Later
/// failures abort the body, which the client sees as a truncated response.
pub async fn chat_stream_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let (conversation, model) = conversation_from(payload)?;
    let request_id = Uuid::new_v4();
    info!(%request_id, messages = conversation.len(), "Streaming chat request");

    let stream = state
        .pipeline
        .reply_stream(&conversation, model.as_deref())
        .await
        .map_err(provider_error)?;

    let body = stream.map(move |fragment| {
        fragment.map(Bytes::from).inspect_err(|e| {
            warn!(%request_id, kind = e.kind(), error = %e, "Stream aborted");
        })
    });

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        Body::from_stream(body),
    )
        .into_response())
}

// ── Space data ────────────────────────────────────────────────────────────

/// `GET /api/data/{category}`: one category's summary, fetched now.
pub async fn data_handler(
    State(state): State<SharedState>,
    Path(category): Path<String>,
    params: Result<Query<DataParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let category: DataCategory = category
        .parse()
        .map_err(|e: String| api_error(StatusCode::NOT_FOUND, "unknown_category", e))?;
    let Query(params) = params.map_err(|e| bad_request(e.body_text()))?;
    let query = data_query(category, &params)?;

    let outcome = state
        .pipeline
        .fetchers()
        .fetch(category, &query)
        .await
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                "unknown_category",
                format!("no fetcher for '{category}'"),
            )
        })?;

    Ok(match outcome {
        FetchOutcome::Available(summary) => (StatusCode::OK, Json(summary)).into_response(),
        FetchOutcome::Unavailable(e) => {
            warn!(%category, error = %e, "Space data unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(UnavailableResponse {
                    category,
                    available: false,
                    reason: e.to_string(),
                }),
            )
                .into_response()
        }
    })
}

fn data_query(category: DataCategory, params: &DataParams) -> Result<FetchQuery, ApiError> {
    let mut query = FetchQuery::default();

    if let Some(date) = params.date.as_deref() {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| bad_request(format!("invalid date '{date}', expected YYYY-MM-DD")))?;
        query = query.with_date(date);
    }

    match (params.lat, params.lon) {
        (Some(lat), Some(lon)) => {
            let point = GeoPoint::new(lat, lon);
            if !point.is_valid() {
                return Err(bad_request("lat must be within ±90 and lon within ±180"));
            }
            if category == DataCategory::EarthImagery && point.is_origin() {
                return Err(bad_request("lat and lon are required for earth imagery"));
            }
            query = query.with_location(point);
        }
        (None, None) if category != DataCategory::EarthImagery => {}
        (None, None) => return Err(bad_request("lat and lon are required for earth imagery")),
        _ => return Err(bad_request("lat and lon must be given together")),
    }

    Ok(query)
}

// ── Ask ───────────────────────────────────────────────────────────────────

/// `GET /ask?question=...`: one question, picture of the day always included.
pub async fn ask_handler(
    State(state): State<SharedState>,
    params: Result<Query<AskParams>, QueryRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Query(params) = params.map_err(|e| bad_request(e.body_text()))?;
    let question = params.question.trim();
    if question.is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    info!(question_len = question.len(), "Ask request");
    let answer = state.pipeline.ask(question).await.map_err(provider_error)?;
    Ok(Json(AskResponse { answer }))
}
