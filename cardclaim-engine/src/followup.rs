//! Random follow-up chatter sent some seconds after a successful claim.
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constants::{
    FOLLOW_UP_STICKER_CHANCE, FOLLOW_UP_TYPING_BASE_MS, FOLLOW_UP_TYPING_SPREAD_MS,
};
use crate::is_group_chat;
use crate::jitter::Jitter;
use crate::transport::{ChatTransport, TransportError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpConfig {
    #[serde(default = "FollowUpConfig::default_typing_base_ms")]
    pub typing_base_ms: u64,
    #[serde(default = "FollowUpConfig::default_typing_spread_ms")]
    pub typing_spread_ms: u64,
    #[serde(default = "FollowUpConfig::default_sticker_chance")]
    pub sticker_chance: f64,
}

impl FollowUpConfig {
    const fn default_typing_base_ms() -> u64 {
        FOLLOW_UP_TYPING_BASE_MS
    }

    const fn default_typing_spread_ms() -> u64 {
        FOLLOW_UP_TYPING_SPREAD_MS
    }

    const fn default_sticker_chance() -> f64 {
        FOLLOW_UP_STICKER_CHANCE
    }
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self {
            typing_base_ms: Self::default_typing_base_ms(),
            typing_spread_ms: Self::default_typing_spread_ms(),
            sticker_chance: Self::default_sticker_chance(),
        }
    }
}

/// Text and sticker pools the responder draws from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponsePools {
    pub texts: Vec<String>,
    pub stickers: Vec<PathBuf>,
}

/// What a follow-up ended up sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    Sticker(PathBuf),
    Text(String),
    /// Nothing to send: direct chat, or the text pool was empty.
    Nothing,
}

#[derive(Clone)]
pub struct FollowUpResponder {
    transport: Arc<dyn ChatTransport>,
    pools: Arc<ResponsePools>,
    jitter: Jitter,
    config: FollowUpConfig,
}

impl FollowUpResponder {
    #[must_use]
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        pools: ResponsePools,
        jitter: Jitter,
        config: FollowUpConfig,
    ) -> Self {
        Self {
            transport,
            pools: Arc::new(pools),
            jitter,
            config,
        }
    }

    /// Type for a moment, then send a random sticker or text.
    ///
    /// A sticker that cannot be read falls back to a random text.
    ///
    /// # Errors
    ///
    /// Returns the first transport error; nothing is retried.
    pub async fn send(&self, chat_id: &str) -> Result<FollowUp, TransportError> {
        if !is_group_chat(chat_id) {
            log::debug!("Skipping random response in direct chat {chat_id}");
            return Ok(FollowUp::Nothing);
        }

        self.transport.send_typing(chat_id).await?;
        let typing = self
            .jitter
            .delay(self.config.typing_base_ms, self.config.typing_spread_ms);
        tokio::time::sleep(typing).await;

        let wants_sticker = self.jitter.chance(self.config.sticker_chance);
        if wants_sticker && let Some(path) = self.jitter.pick(&self.pools.stickers) {
            match tokio::fs::read(path).await {
                Ok(bytes) => {
                    self.transport.send_sticker(chat_id, bytes).await?;
                    return Ok(FollowUp::Sticker(path.clone()));
                }
                Err(err) => {
                    log::error!("Error reading sticker file {}: {err}", path.display());
                }
            }
        }
        self.send_random_text(chat_id).await
    }

    async fn send_random_text(&self, chat_id: &str) -> Result<FollowUp, TransportError> {
        let Some(text) = self.jitter.pick(&self.pools.texts) else {
            log::warn!("No random texts configured; follow-up in {chat_id} skipped");
            return Ok(FollowUp::Nothing);
        };
        self.transport.send_text(chat_id, text).await?;
        Ok(FollowUp::Text(text.clone()))
    }
}
