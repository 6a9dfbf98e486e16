use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by the chat transport. Never fatal to the engine.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    Disconnected,
    #[error("send to {chat_id} rejected: {reason}")]
    Rejected { chat_id: String, reason: String },
    #[error("transport I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Outbound side of the chat session.
///
/// Implementations own connection state; the engine only ever calls these
/// three operations and treats every error as non-fatal.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a plain text message.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be delivered to the session.
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), TransportError>;

    /// Show the "composing" presence indicator in a chat.
    ///
    /// # Errors
    ///
    /// Returns an error if the presence update could not be delivered.
    async fn send_typing(&self, chat_id: &str) -> Result<(), TransportError>;

    /// Send a sticker from its encoded image bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the sticker could not be delivered.
    async fn send_sticker(&self, chat_id: &str, sticker: Vec<u8>) -> Result<(), TransportError>;
}
