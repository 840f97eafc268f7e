//! Conversation and wire types for the `generateContent` API

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::media::EncodedImage;

/// Default aspect ratio for generated images
pub const DEFAULT_ASPECT_RATIO: &str = "1:1";

/// Default output resolution
pub const DEFAULT_IMAGE_SIZE: &str = "2K";

/// MIME type assumed when the API omits one
const DEFAULT_MIME_TYPE: &str = "image/png";

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "model")]
    Assistant,
}

/// Base64 image payload with its MIME type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(alias = "mime_type", default = "default_mime_type")]
    pub mime_type: String,
    pub data: String,
}

fn default_mime_type() -> String {
    DEFAULT_MIME_TYPE.to_string()
}

impl From<&EncodedImage> for InlineData {
    fn from(image: &EncodedImage) -> Self {
        Self {
            mime_type: image.mime_type.clone(),
            data: image.data.clone(),
        }
    }
}

/// One component of a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineImage {
        #[serde(rename = "inlineData", alias = "inline_data")]
        inline_data: InlineData,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        thought: bool,
    },
}

impl Part {
    /// Text part
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Inline image part
    #[must_use]
    pub const fn image(inline_data: InlineData, thought: bool) -> Self {
        Self::InlineImage {
            inline_data,
            thought,
        }
    }

    /// Text content, if this is a text part
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::InlineImage { .. } => None,
        }
    }

    /// Image payload, if this is an image part
    #[must_use]
    pub const fn as_image(&self) -> Option<&InlineData> {
        match self {
            Self::InlineImage { inline_data, .. } => Some(inline_data),
            Self::Text { .. } => None,
        }
    }
}

/// One exchange unit of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    /// User turn: the prompt text followed by the images in input order
    #[must_use]
    pub fn user(prompt: &str, images: &[EncodedImage]) -> Self {
        let mut parts = Vec::with_capacity(images.len() + 1);
        parts.push(Part::text(prompt));
        parts.extend(images.iter().map(|img| Part::image(img.into(), false)));

        Self {
            role: Role::User,
            parts,
        }
    }

    /// Assistant turn from already-synthesized parts
    #[must_use]
    pub const fn assistant(parts: Vec<Part>) -> Self {
        Self {
            role: Role::Assistant,
            parts,
        }
    }
}

/// Per-request generation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    /// Aspect ratio such as `1:1`, `16:9`, `5:4`
    pub aspect_ratio: String,
    /// Output resolution: `1K`, `2K` or `4K`
    pub image_size: String,
    /// Collect `thought`-tagged images from the response
    pub include_thinking: bool,
    /// Attach the Google Search grounding tool
    pub use_search: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
            include_thinking: false,
            use_search: false,
        }
    }
}

impl SendOptions {
    /// Defaults for multi-image composites
    #[must_use]
    pub fn composite() -> Self {
        Self::default().with_aspect_ratio("5:4")
    }

    /// Defaults for search-grounded generation
    #[must_use]
    pub fn search() -> Self {
        Self {
            use_search: true,
            ..Self::default().with_aspect_ratio("16:9")
        }
    }

    #[must_use]
    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = aspect_ratio.into();
        self
    }

    #[must_use]
    pub fn with_image_size(mut self, image_size: impl Into<String>) -> Self {
        self.image_size = image_size.into();
        self
    }

    #[must_use]
    pub const fn with_thinking(mut self, include_thinking: bool) -> Self {
        self.include_thinking = include_thinking;
        self
    }

    #[must_use]
    pub const fn with_search(mut self, use_search: bool) -> Self {
        self.use_search = use_search;
        self
    }
}

/// Request body for `generateContent`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest<'a> {
    pub contents: Vec<&'a Turn>,
    pub generation_config: GenerationConfig<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

impl<'a> GenerateContentRequest<'a> {
    /// Prior turns in order, followed by the pending user turn
    pub fn new(history: &'a [Turn], pending: &'a Turn, options: &'a SendOptions) -> Self {
        let contents = history.iter().chain(std::iter::once(pending)).collect();

        Self {
            contents,
            generation_config: GenerationConfig {
                response_modalities: ["TEXT", "IMAGE"],
                image_config: ImageConfig {
                    aspect_ratio: &options.aspect_ratio,
                    image_size: &options.image_size,
                },
            },
            tools: options.use_search.then(|| vec![Tool::google_search()]),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig<'a> {
    pub response_modalities: [&'static str; 2],
    pub image_config: ImageConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageConfig<'a> {
    pub aspect_ratio: &'a str,
    pub image_size: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct Tool {
    google_search: GoogleSearch,
}

impl Tool {
    const fn google_search() -> Self {
        Self {
            google_search: GoogleSearch {},
        }
    }
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

/// Subset of the `generateContent` response the session consumes
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub grounding_metadata: Option<Value>,
    #[serde(rename = "thought_signature", alias = "thoughtSignature")]
    pub thought_signature: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: CandidateContent,
    pub grounding_metadata: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResponsePart {
    pub text: Option<String>,
    #[serde(alias = "inline_data")]
    pub inline_data: Option<InlineData>,
    #[serde(default)]
    pub thought: bool,
    pub thought_signature: Option<String>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[ResponsePart] {
        self.candidates
            .first()
            .map(|c| c.content.parts.as_slice())
            .unwrap_or_default()
    }

    /// First inline image of the first candidate
    pub fn image_data(&self) -> Option<String> {
        self.first_parts()
            .iter()
            .find_map(|p| p.inline_data.as_ref().map(|d| d.data.clone()))
    }

    /// `thought`-tagged images of the first candidate
    pub fn thinking_images(&self) -> Vec<String> {
        self.first_parts()
            .iter()
            .filter(|p| p.thought)
            .filter_map(|p| p.inline_data.as_ref().map(|d| d.data.clone()))
            .collect()
    }

    /// First non-empty text part of the first candidate
    pub fn text(&self) -> String {
        self.first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .find(|t| !t.is_empty())
            .unwrap_or_default()
            .to_string()
    }

    /// Top-level signature, falling back to the first part-level one
    pub fn thought_signature(&self) -> Option<String> {
        self.thought_signature.clone().or_else(|| {
            self.first_parts()
                .iter()
                .find_map(|p| p.thought_signature.clone())
        })
    }

    /// Top-level grounding metadata, falling back to the first candidate's
    pub fn grounding_metadata(&self) -> Option<Value> {
        self.grounding_metadata.clone().or_else(|| {
            self.candidates
                .first()
                .and_then(|c| c.grounding_metadata.clone())
        })
    }

    /// Parts of the assistant turn recorded in history
    ///
    /// Thinking images come first (only when requested), then every text
    /// and image part of the candidate in response order. Candidate images
    /// are recorded with `thought: false`, including thought-tagged ones.
    pub fn assistant_parts(&self, thinking_images: &[String]) -> Vec<Part> {
        let mut parts: Vec<Part> = thinking_images
            .iter()
            .map(|data| {
                Part::image(
                    InlineData {
                        mime_type: DEFAULT_MIME_TYPE.to_string(),
                        data: data.clone(),
                    },
                    true,
                )
            })
            .collect();

        for part in self.first_parts() {
            if let Some(text) = part.text.as_deref().filter(|t| !t.is_empty()) {
                parts.push(Part::text(text));
            } else if let Some(inline) = &part.inline_data {
                parts.push(Part::image(inline.clone(), false));
            }
        }

        parts
    }
}

/// Decoded result of one `send_message` call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    /// First non-empty text part, or empty
    pub text: String,
    /// Base64 data of the first image part
    pub image_data: Option<String>,
    /// Intermediate images, when thinking output was requested
    pub thinking_images: Vec<String>,
    /// Opaque reasoning signature returned by the API
    pub thought_signature: Option<String>,
    /// Search provenance, when search grounding was used
    pub grounding_metadata: Option<Value>,
    /// Untouched response body
    pub raw_response: Value,
}
