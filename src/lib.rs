//! Image Chat - multi-turn conversational image generation
//!
//! This library wraps a Gemini-style `generateContent` image endpoint:
//! - Conversation sessions that replay the full transcript on every call
//! - Reference image encoding (up to 14 inline images per request)
//! - An HTTP gateway mapping client session ids to conversations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │   CLI (image-chat ...)   │   │   HTTP gateway (/api)    │
//! └────────────┬─────────────┘   └────────────┬─────────────┘
//!              │                 ┌────────────▼─────────────┐
//!              │                 │   Session store          │
//!              │                 └────────────┬─────────────┘
//! ┌────────────▼──────────────────────────────▼─────────────┐
//! │          Conversation session (history + signature)      │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │ POST generateContent
//! ┌────────────────────────────▼─────────────────────────────┐
//! │                 Image generation API                      │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod media;
pub mod setup;
pub mod store;

pub use chat::{ChatReply, ConversationSession, InlineData, Part, Role, SendOptions, Turn};
pub use config::{Config, GeminiConfig};
pub use error::{Error, Result};
pub use media::{EncodedImage, MAX_REFERENCE_IMAGES};
pub use store::{SessionStore, SharedSession};
