//! Conversation endpoints: generate, edit, composite, search, reset, history

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::chat::{ChatReply, DEFAULT_ASPECT_RATIO, DEFAULT_IMAGE_SIZE, SendOptions, Turn};
use crate::media::{EncodedImage, MAX_REFERENCE_IMAGES};

/// MIME type assumed for images uploaded without one
const UPLOAD_MIME_TYPE: &str = "image/png";

/// Build chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/generate-image", post(generate_image))
        .route("/edit-image", post(edit_image))
        .route("/composite-images", post(composite_images))
        .route("/generate-with-search", post(generate_with_search))
        .route("/continue-chat", post(continue_chat))
        .route("/reset-chat", post(reset_chat))
        .route("/chat-history/{session_id}", get(chat_history))
        .with_state(state)
}

fn default_aspect_ratio() -> String {
    DEFAULT_ASPECT_RATIO.to_string()
}

fn default_image_size() -> String {
    DEFAULT_IMAGE_SIZE.to_string()
}

fn composite_aspect_ratio() -> String {
    SendOptions::composite().aspect_ratio
}

fn search_aspect_ratio() -> String {
    SendOptions::search().aspect_ratio
}

/// Text-to-image request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageRequest {
    pub prompt: Option<String>,
    pub session_id: Option<String>,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_image_size")]
    pub image_size: String,
    #[serde(default)]
    pub include_thinking: bool,
}

/// Image edit request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditImageRequest {
    pub image_data: Option<String>,
    pub edit_prompt: Option<String>,
    pub session_id: Option<String>,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_image_size")]
    pub image_size: String,
    #[serde(default)]
    pub include_thinking: bool,
}

/// A reference image: bare base64 or an object with an optional MIME type
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ImageInput {
    Data(String),
    Object {
        #[serde(default)]
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: Option<String>,
    },
}

impl ImageInput {
    fn into_encoded(self) -> EncodedImage {
        match self {
            Self::Data(data) => EncodedImage::new(data, UPLOAD_MIME_TYPE),
            Self::Object { data, mime_type } => EncodedImage::new(
                data,
                mime_type.unwrap_or_else(|| UPLOAD_MIME_TYPE.to_string()),
            ),
        }
    }
}

/// Multi-image composite request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeImagesRequest {
    pub prompt: Option<String>,
    #[serde(default)]
    pub image_data_list: Vec<ImageInput>,
    pub session_id: Option<String>,
    #[serde(default = "composite_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_image_size")]
    pub image_size: String,
    #[serde(default)]
    pub include_thinking: bool,
}

/// Search-grounded generation request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub prompt: Option<String>,
    pub session_id: Option<String>,
    #[serde(default = "search_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_image_size")]
    pub image_size: String,
}

/// Follow-up prompt request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueChatRequest {
    pub prompt: Option<String>,
    pub session_id: Option<String>,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_image_size")]
    pub image_size: String,
}

/// Reset request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetChatRequest {
    pub session_id: Option<String>,
}

/// Reset response
#[derive(Debug, Serialize)]
pub struct ResetChatResponse {
    pub success: bool,
    pub message: &'static str,
}

/// History response
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<Turn>,
}

/// Require a non-empty field
fn required(value: Option<String>, name: &'static str) -> Result<String, ChatError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ChatError::MissingField(name))
}

/// Run one turn on the named session
async fn send(
    state: &ApiState,
    session_id: &str,
    prompt: &str,
    images: &[EncodedImage],
    options: &SendOptions,
) -> Result<Json<ChatReply>, ChatError> {
    let session = state.sessions.ensure(session_id).await;
    let mut session = session.lock().await;
    let reply = session.send_message(prompt, images, options).await?;
    Ok(Json(reply))
}

async fn generate_image(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<GenerateImageRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ChatError> {
    let Json(request) = payload?;
    let session_id = required(request.session_id, "sessionId")?;
    let prompt = required(request.prompt, "prompt")?;

    let options = SendOptions::default()
        .with_aspect_ratio(request.aspect_ratio)
        .with_image_size(request.image_size)
        .with_thinking(request.include_thinking);

    send(&state, &session_id, &prompt, &[], &options).await
}

async fn edit_image(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<EditImageRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ChatError> {
    let Json(request) = payload?;
    let session_id = required(request.session_id, "sessionId")?;
    let image_data = required(request.image_data, "imageData")?;
    let prompt = required(request.edit_prompt, "editPrompt")?;

    let options = SendOptions::default()
        .with_aspect_ratio(request.aspect_ratio)
        .with_image_size(request.image_size)
        .with_thinking(request.include_thinking);
    let image = EncodedImage::new(image_data, UPLOAD_MIME_TYPE);

    send(&state, &session_id, &prompt, &[image], &options).await
}

async fn composite_images(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<CompositeImagesRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ChatError> {
    let Json(request) = payload?;
    let session_id = required(request.session_id, "sessionId")?;
    let prompt = required(request.prompt, "prompt")?;

    if request.image_data_list.is_empty() {
        return Err(ChatError::MissingField("imageDataList"));
    }
    if request.image_data_list.len() > MAX_REFERENCE_IMAGES {
        return Err(ChatError::TooManyImages(request.image_data_list.len()));
    }

    let images: Vec<EncodedImage> = request
        .image_data_list
        .into_iter()
        .map(ImageInput::into_encoded)
        .filter(|img| !img.data.is_empty())
        .collect();

    let options = SendOptions::default()
        .with_aspect_ratio(request.aspect_ratio)
        .with_image_size(request.image_size)
        .with_thinking(request.include_thinking);

    send(&state, &session_id, &prompt, &images, &options).await
}

async fn generate_with_search(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ChatError> {
    let Json(request) = payload?;
    let session_id = required(request.session_id, "sessionId")?;
    let prompt = required(request.prompt, "prompt")?;

    let options = SendOptions::search()
        .with_aspect_ratio(request.aspect_ratio)
        .with_image_size(request.image_size);

    send(&state, &session_id, &prompt, &[], &options).await
}

async fn continue_chat(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<ContinueChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ChatError> {
    let Json(request) = payload?;
    let session_id = required(request.session_id, "sessionId")?;
    let prompt = required(request.prompt, "prompt")?;

    let options = SendOptions::default()
        .with_aspect_ratio(request.aspect_ratio)
        .with_image_size(request.image_size);

    send(&state, &session_id, &prompt, &[], &options).await
}

async fn reset_chat(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<ResetChatRequest>, JsonRejection>,
) -> Result<Json<ResetChatResponse>, ChatError> {
    let Json(request) = payload?;
    let session_id = required(request.session_id, "sessionId")?;

    if !state.sessions.reset(&session_id).await {
        tracing::debug!(session_id = %session_id, "reset requested for unknown session");
    }

    Ok(Json(ResetChatResponse {
        success: true,
        message: "conversation reset",
    }))
}

async fn chat_history(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<String>,
) -> Json<HistoryResponse> {
    let history = match state.sessions.get(&session_id).await {
        Some(session) => session.lock().await.history().to_vec(),
        None => Vec::new(),
    };

    Json(HistoryResponse { history })
}

/// Chat API errors
#[derive(Debug)]
pub enum ChatError {
    InvalidBody(String),
    MissingField(&'static str),
    TooManyImages(usize),
    Upstream(crate::Error),
}

impl From<crate::Error> for ChatError {
    fn from(err: crate::Error) -> Self {
        Self::Upstream(err)
    }
}

impl From<JsonRejection> for ChatError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, error) = match self {
            Self::InvalidBody(reason) => (
                StatusCode::BAD_REQUEST,
                format!("invalid request body: {reason}"),
            ),
            Self::MissingField(field) => (
                StatusCode::BAD_REQUEST,
                format!("missing required field: {field}"),
            ),
            Self::TooManyImages(count) => (
                StatusCode::BAD_REQUEST,
                format!("at most {MAX_REFERENCE_IMAGES} reference images are supported (got {count})"),
            ),
            Self::Upstream(err) => {
                tracing::error!(error = %err, "chat request failed");
                let message = match &err {
                    crate::Error::Api { body, .. } if !body.is_empty() => format!("{err} - {body}"),
                    _ => err.to_string(),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
