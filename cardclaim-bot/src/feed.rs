//! Inbound event filtering and transcript replay.
use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use cardclaim_engine::{
    ArbitrationOutcome, ClaimArbiter, ConfigStore, InboundMessage, constants, is_group_chat,
};
use colored::Colorize;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::extract::MessagePayload;

const ADMIN_PREFIX: &str = "$opbot-";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    pub remote_jid: String,
    #[serde(default)]
    pub participant: Option<String>,
    #[serde(default)]
    pub from_me: bool,
}

/// One line of a transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    pub key: MessageKey,
    #[serde(default)]
    pub message: Option<MessagePayload>,
    /// Pause before this event is delivered.
    #[serde(default, alias = "after_ms")]
    pub after_ms: u64,
}

impl InboundEvent {
    /// Sender number: the participant (or the chat itself) up to `@`.
    pub fn sender_id(&self) -> &str {
        let author = self
            .key
            .participant
            .as_deref()
            .unwrap_or(&self.key.remote_jid);
        author.split('@').next().unwrap_or(author)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    StatusBroadcast,
    NoPayload,
    DirectChat,
    NotAllowed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::StatusBroadcast => "status broadcast",
            Self::NoPayload => "no message payload",
            Self::DirectChat => "not a group chat",
            Self::NotAllowed => "sender not allowed",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Skip(SkipReason),
    /// Operator command; the command router is not part of this runner.
    Admin { sender_id: String, command: String },
    Candidate(InboundMessage),
}

/// Decide where an inbound event goes, in the order the live bot checks.
pub fn route(event: &InboundEvent, config: &dyn ConfigStore) -> Route {
    let chat_id = event.key.remote_jid.as_str();
    if chat_id == constants::STATUS_BROADCAST_CHAT {
        return Route::Skip(SkipReason::StatusBroadcast);
    }
    let Some(payload) = event.message.as_ref() else {
        return Route::Skip(SkipReason::NoPayload);
    };
    if !is_group_chat(chat_id) {
        return Route::Skip(SkipReason::DirectChat);
    }

    let text = payload.text();
    let sender_id = event.sender_id();
    if text.starts_with(ADMIN_PREFIX) {
        return Route::Admin {
            sender_id: sender_id.to_string(),
            command: text.to_string(),
        };
    }
    if !config.is_allowed(sender_id) {
        return Route::Skip(SkipReason::NotAllowed);
    }
    Route::Candidate(InboundMessage {
        chat_id: chat_id.to_string(),
        sender_id: sender_id.to_string(),
        text: text.to_string(),
        from_self: event.key.from_me,
    })
}

/// Per-outcome counts for one replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub events: usize,
    pub invalid: usize,
    pub skipped: usize,
    pub admin: usize,
    pub ignored: usize,
    pub queued: usize,
    pub deferred: usize,
    pub overflowed: usize,
    pub other_claims: usize,
    pub reactions: usize,
}

impl ReplaySummary {
    fn record(&mut self, outcome: &ArbitrationOutcome) {
        match outcome {
            ArbitrationOutcome::Disabled | ArbitrationOutcome::Ignored => self.ignored += 1,
            ArbitrationOutcome::Queued(_) => self.queued += 1,
            ArbitrationOutcome::Deferred { .. } => self.deferred += 1,
            ArbitrationOutcome::Overflowed { .. } => self.overflowed += 1,
            ArbitrationOutcome::OtherClaim { reaction, .. } => {
                self.other_claims += 1;
                if reaction.is_some_and(|r| r.steal_back || r.taunt) {
                    self.reactions += 1;
                }
            }
        }
    }
}

/// Feed JSON-lines events through the arbiter. Bad lines are logged and skipped.
pub async fn replay<R>(
    reader: R,
    arbiter: &ClaimArbiter,
    config: &dyn ConfigStore,
) -> Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = ReplaySummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("failed to read transcript")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: InboundEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(err) => {
                log::warn!("Skipping transcript line {line_no}: {err}");
                summary.invalid += 1;
                continue;
            }
        };
        summary.events += 1;
        if event.after_ms > 0 {
            tokio::time::sleep(Duration::from_millis(event.after_ms)).await;
        }

        match route(&event, config) {
            Route::Skip(reason) => {
                log::debug!("Line {line_no} skipped: {reason}");
                summary.skipped += 1;
            }
            Route::Admin { sender_id, command } => {
                log::info!("Admin command from {sender_id} not handled here: {command}");
                summary.admin += 1;
            }
            Route::Candidate(message) => {
                let outcome = arbiter.on_candidate_message(&message).await;
                report(&message, &outcome);
                summary.record(&outcome);
            }
        }
    }
    Ok(summary)
}

fn report(message: &InboundMessage, outcome: &ArbitrationOutcome) {
    let line = match outcome {
        ArbitrationOutcome::Disabled | ArbitrationOutcome::Ignored => return,
        ArbitrationOutcome::Queued(task) => {
            format!("🎯 queued {} ({})", task.claim_id, task.reason).green()
        }
        ArbitrationOutcome::Deferred { claim_id, reason } => {
            format!("⏭️  passed on {claim_id} ({reason})").yellow()
        }
        ArbitrationOutcome::Overflowed { claim_id, error } => {
            format!("⚠️  {claim_id} not queued: {error}").red()
        }
        ArbitrationOutcome::OtherClaim { claim_id, reaction } => match reaction {
            Some(r) => format!(
                "👀 {} claimed {claim_id} (steal back: {}, taunt: {})",
                message.sender_id, r.steal_back, r.taunt
            )
            .bright_magenta(),
            None => return,
        },
    };
    println!("{line}");
}
