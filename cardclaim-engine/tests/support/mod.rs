#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use cardclaim_engine::{BotSettings, ChatTransport, ProbabilityTable, TransportError};
use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Typing { chat_id: String },
    Text { chat_id: String, text: String },
    Sticker { chat_id: String, bytes: usize },
}

/// Transport double that records every call with its virtual timestamp.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    log: Mutex<Vec<(Instant, Sent)>>,
    failing_texts: Mutex<HashSet<String>>,
    panicking_texts: Mutex<HashSet<String>>,
    failing_typing: AtomicBool,
}

impl RecordingTransport {
    pub fn fail_on(&self, text: &str) {
        self.failing_texts.lock().insert(text.to_string());
    }

    pub fn panic_on(&self, text: &str) {
        self.panicking_texts.lock().insert(text.to_string());
    }

    pub fn fail_typing(&self) {
        self.failing_typing.store(true, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<(Instant, Sent)> {
        self.log.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter_map(|(_, sent)| match sent {
                Sent::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn timed_texts(&self) -> Vec<(Instant, String)> {
        self.log
            .lock()
            .iter()
            .filter_map(|(at, sent)| match sent {
                Sent::Text { text, .. } => Some((*at, text.clone())),
                _ => None,
            })
            .collect()
    }

    fn record(&self, sent: Sent) {
        self.log.lock().push((Instant::now(), sent));
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), TransportError> {
        if self.panicking_texts.lock().contains(text) {
            panic!("transport blew up on {text}");
        }
        if self.failing_texts.lock().contains(text) {
            return Err(TransportError::Rejected {
                chat_id: chat_id.to_string(),
                reason: "simulated failure".to_string(),
            });
        }
        self.record(Sent::Text {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_typing(&self, chat_id: &str) -> Result<(), TransportError> {
        if self.failing_typing.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        self.record(Sent::Typing {
            chat_id: chat_id.to_string(),
        });
        Ok(())
    }

    async fn send_sticker(&self, chat_id: &str, sticker: Vec<u8>) -> Result<(), TransportError> {
        self.record(Sent::Sticker {
            chat_id: chat_id.to_string(),
            bytes: sticker.len(),
        });
        Ok(())
    }
}

pub const GROUP: &str = "120363000000000001@g.us";

/// Settings with every claim probability set to `p` and follow-ups off.
pub fn settings_with_probability(p: f64) -> BotSettings {
    let mut settings = BotSettings {
        probabilities: ProbabilityTable::uniform(p),
        ..BotSettings::default()
    };
    settings.pacing.follow_up_chance = 0.0;
    settings
}
