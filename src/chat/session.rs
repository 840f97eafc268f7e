//! Multi-turn conversation session against the `generateContent` API
//!
//! The session keeps the full transcript client-side and replays it on every
//! request, so follow-up prompts ("now make it blue") see earlier turns.

use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;

use super::types::{ChatReply, GenerateContentRequest, GenerateContentResponse, SendOptions, Turn};
use crate::config::GeminiConfig;
use crate::media::{self, EncodedImage};
use crate::{Error, Result};

/// Header carrying the API key
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client-side conversation with an image generation model
pub struct ConversationSession {
    id: String,
    config: GeminiConfig,
    http: reqwest::Client,
    history: Vec<Turn>,
    thought_signature: Option<String>,
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("id", &self.id)
            .field("api_url", &self.config.api_url)
            .field("turns", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl ConversationSession {
    /// Create a fresh session with its own HTTP client
    #[must_use]
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Create a fresh session sharing an existing HTTP client
    #[must_use]
    pub fn with_client(config: GeminiConfig, http: reqwest::Client) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            config,
            http,
            history: Vec::new(),
            thought_signature: None,
        }
    }

    /// Override the generated session identifier
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Turns accumulated so far, oldest first
    #[must_use]
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Signature returned by the most recent response
    #[must_use]
    pub fn thought_signature(&self) -> Option<&str> {
        self.thought_signature.as_deref()
    }

    /// Number of recorded turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Forget all turns and the last thought signature
    pub fn reset(&mut self) {
        self.history.clear();
        self.thought_signature = None;
        tracing::debug!(session_id = %self.id, "conversation reset");
    }

    /// Send a prompt (plus optional reference images) with the full history
    ///
    /// On success the user turn and a synthesized assistant turn are
    /// appended to the history. Any failure leaves the history untouched.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, the API answers with a
    /// non-success status, or the body is not valid JSON
    pub async fn send_message(
        &mut self,
        prompt: &str,
        images: &[EncodedImage],
        options: &SendOptions,
    ) -> Result<ChatReply> {
        let user_turn = Turn::user(prompt, images);

        tracing::debug!(
            session_id = %self.id,
            turns = self.history.len() + 1,
            images = images.len(),
            aspect_ratio = %options.aspect_ratio,
            image_size = %options.image_size,
            search = options.use_search,
            "sending generateContent request"
        );

        let pending = {
            let request = GenerateContentRequest::new(&self.history, &user_turn, options);
            self.http
                .post(&self.config.api_url)
                .header(API_KEY_HEADER, self.config.api_key.expose_secret())
                .json(&request)
                .send()
        };
        let response = pending.await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                session_id = %self.id,
                status = status.as_u16(),
                body = %body,
                "generateContent request failed"
            );
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw: Value = response.json().await?;
        let parsed = GenerateContentResponse::deserialize(&raw)?;

        let thinking_images = if options.include_thinking {
            parsed.thinking_images()
        } else {
            Vec::new()
        };
        let assistant_parts = parsed.assistant_parts(&thinking_images);

        self.history.push(user_turn);
        if assistant_parts.is_empty() {
            tracing::warn!(session_id = %self.id, "response had no usable parts");
        } else {
            self.history.push(Turn::assistant(assistant_parts));
        }
        self.thought_signature = parsed.thought_signature();

        let reply = ChatReply {
            text: parsed.text(),
            image_data: parsed.image_data(),
            thinking_images,
            thought_signature: self.thought_signature.clone(),
            grounding_metadata: parsed.grounding_metadata(),
            raw_response: raw,
        };

        tracing::info!(
            session_id = %self.id,
            turns = self.history.len(),
            has_image = reply.image_data.is_some(),
            "conversation updated"
        );

        Ok(reply)
    }

    /// Generate an image from a text prompt, returning base64 data
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or no image is returned
    pub async fn generate_image(&mut self, prompt: &str, options: &SendOptions) -> Result<String> {
        self.send_message(prompt, &[], options)
            .await?
            .image_data
            .ok_or(Error::NoImage)
    }

    /// Edit a local image and write the result to `output_path`
    ///
    /// # Errors
    ///
    /// Returns error if the input cannot be read, the request fails, no
    /// image is returned, or the output cannot be written
    pub async fn edit_image(
        &mut self,
        input_path: &Path,
        prompt: &str,
        output_path: &Path,
        options: &SendOptions,
    ) -> Result<PathBuf> {
        let image = media::encode_image_file(input_path)?;
        let reply = self
            .send_message(prompt, std::slice::from_ref(&image), options)
            .await?;

        save_reply_image(reply, output_path)
    }

    /// Compose a new image from up to 14 reference images
    ///
    /// # Errors
    ///
    /// Returns error if more than 14 images are given, an input cannot be
    /// read, the request fails, no image is returned, or the output cannot
    /// be written
    pub async fn composite_images<P: AsRef<Path>>(
        &mut self,
        prompt: &str,
        image_paths: &[P],
        output_path: &Path,
        options: &SendOptions,
    ) -> Result<PathBuf> {
        let images = media::encode_image_files(image_paths)?;
        let reply = self.send_message(prompt, &images, options).await?;

        save_reply_image(reply, output_path)
    }

    /// Send a follow-up, optionally starting over first
    ///
    /// # Errors
    ///
    /// Returns error if the request fails
    pub async fn continue_conversation(
        &mut self,
        prompt: &str,
        include_history: bool,
        options: &SendOptions,
    ) -> Result<ChatReply> {
        if !include_history {
            self.reset();
        }

        self.send_message(prompt, &[], options).await
    }
}

fn save_reply_image(reply: ChatReply, output_path: &Path) -> Result<PathBuf> {
    let data = reply.image_data.ok_or(Error::NoImage)?;
    media::save_base64_image(&data, output_path)?;
    Ok(output_path.to_path_buf())
}
