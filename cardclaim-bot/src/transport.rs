use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use cardclaim_engine::{ChatTransport, TransportError};
use chrono::Local;
use colored::Colorize;

/// Prints outbound actions instead of sending them.
#[derive(Debug, Default)]
pub struct ConsoleTransport {
    texts: AtomicUsize,
    stickers: AtomicUsize,
}

impl ConsoleTransport {
    pub fn texts_sent(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }

    pub fn stickers_sent(&self) -> usize {
        self.stickers.load(Ordering::SeqCst)
    }
}

fn stamp() -> String {
    Local::now().format("%H:%M:%S%.3f").to_string()
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), TransportError> {
        self.texts.fetch_add(1, Ordering::SeqCst);
        log::debug!("send_text {chat_id}: {text}");
        println!(
            "{} {} {}",
            stamp().dimmed(),
            format!("[{chat_id}]").cyan(),
            text.bright_green().bold()
        );
        Ok(())
    }

    async fn send_typing(&self, chat_id: &str) -> Result<(), TransportError> {
        log::debug!("send_typing {chat_id}");
        println!(
            "{} {} {}",
            stamp().dimmed(),
            format!("[{chat_id}]").cyan(),
            "typing…".dimmed()
        );
        Ok(())
    }

    async fn send_sticker(&self, chat_id: &str, sticker: Vec<u8>) -> Result<(), TransportError> {
        self.stickers.fetch_add(1, Ordering::SeqCst);
        log::debug!("send_sticker {chat_id}: {} bytes", sticker.len());
        println!(
            "{} {} {}",
            stamp().dimmed(),
            format!("[{chat_id}]").cyan(),
            format!("<sticker {} bytes>", sticker.len()).magenta()
        );
        Ok(())
    }
}
