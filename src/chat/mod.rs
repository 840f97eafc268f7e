//! Conversational image generation

mod session;
mod types;

pub use session::ConversationSession;
pub use types::{
    ChatReply, DEFAULT_ASPECT_RATIO, DEFAULT_IMAGE_SIZE, InlineData, Part, Role, SendOptions, Turn,
};
