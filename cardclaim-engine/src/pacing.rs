//! Claim pacing queue.
//!
//! Claims run one at a time through a single worker task: configured delay,
//! typing indicator, typing jitter, the `.claim` send, an optional follow-up
//! scheduled off to the side, then a buffer before the next claim.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Notify, mpsc};

use crate::constants::{
    CLAIM_BUFFER_FLOOR_MS, CLAIM_BUFFER_RATIO, CLAIM_TYPING_BASE_MS, CLAIM_TYPING_SPREAD_MS,
    FOLLOW_UP_CHANCE, FOLLOW_UP_DELAY_MAX_MS, FOLLOW_UP_DELAY_MIN_MS,
};
use crate::followup::FollowUpResponder;
use crate::jitter::Jitter;
use crate::patterns::claim_command;
use crate::transport::{ChatTransport, TransportError};

/// One accepted claim waiting for its turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimTask {
    pub chat_id: String,
    pub claim_id: String,
    pub card_name: Option<String>,
    pub reason: String,
    pub configured_delay_ms: u64,
}

impl ClaimTask {
    #[must_use]
    pub fn new(
        chat_id: impl Into<String>,
        claim_id: impl Into<String>,
        card_name: Option<String>,
        reason: impl Into<String>,
        configured_delay_ms: u64,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            claim_id: claim_id.into(),
            card_name,
            reason: reason.into(),
            configured_delay_ms,
        }
    }

    /// Text sent to the chat for this claim.
    #[must_use]
    pub fn command(&self) -> String {
        claim_command(&self.claim_id)
    }

    #[must_use]
    pub const fn configured_delay(&self) -> Duration {
        Duration::from_millis(self.configured_delay_ms)
    }
}

/// Timing knobs for the pacing worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "PacingConfig::default_typing_base_ms")]
    pub typing_base_ms: u64,
    #[serde(default = "PacingConfig::default_typing_spread_ms")]
    pub typing_spread_ms: u64,
    #[serde(default = "PacingConfig::default_buffer_floor_ms")]
    pub buffer_floor_ms: u64,
    #[serde(default = "PacingConfig::default_buffer_ratio")]
    pub buffer_ratio: f64,
    #[serde(default = "PacingConfig::default_follow_up_chance")]
    pub follow_up_chance: f64,
    #[serde(default = "PacingConfig::default_follow_up_delay_min_ms")]
    pub follow_up_delay_min_ms: u64,
    #[serde(default = "PacingConfig::default_follow_up_delay_max_ms")]
    pub follow_up_delay_max_ms: u64,
    /// Cap on queued plus running claims; `None` leaves the queue unbounded.
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl PacingConfig {
    const fn default_typing_base_ms() -> u64 {
        CLAIM_TYPING_BASE_MS
    }

    const fn default_typing_spread_ms() -> u64 {
        CLAIM_TYPING_SPREAD_MS
    }

    const fn default_buffer_floor_ms() -> u64 {
        CLAIM_BUFFER_FLOOR_MS
    }

    const fn default_buffer_ratio() -> f64 {
        CLAIM_BUFFER_RATIO
    }

    const fn default_follow_up_chance() -> f64 {
        FOLLOW_UP_CHANCE
    }

    const fn default_follow_up_delay_min_ms() -> u64 {
        FOLLOW_UP_DELAY_MIN_MS
    }

    const fn default_follow_up_delay_max_ms() -> u64 {
        FOLLOW_UP_DELAY_MAX_MS
    }

    /// Pause after a claim: `max(buffer_floor, buffer_ratio × configured delay)`.
    #[must_use]
    pub fn buffer_after(&self, task: &ClaimTask) -> Duration {
        let scaled = Duration::try_from_secs_f64(task.configured_delay().as_secs_f64() * self.buffer_ratio)
            .unwrap_or(Duration::ZERO);
        scaled.max(Duration::from_millis(self.buffer_floor_ms))
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            typing_base_ms: Self::default_typing_base_ms(),
            typing_spread_ms: Self::default_typing_spread_ms(),
            buffer_floor_ms: Self::default_buffer_floor_ms(),
            buffer_ratio: Self::default_buffer_ratio(),
            follow_up_chance: Self::default_follow_up_chance(),
            follow_up_delay_min_ms: Self::default_follow_up_delay_min_ms(),
            follow_up_delay_max_ms: Self::default_follow_up_delay_max_ms(),
            max_depth: None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("claim queue is full ({depth} claims pending)")]
    Full { depth: usize },
    #[error("claim worker has stopped")]
    Closed,
}

#[derive(Debug, Default)]
struct QueueState {
    depth: AtomicUsize,
    processing: AtomicBool,
    idle: Notify,
}

impl QueueState {
    fn release(&self) {
        if self.depth.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Holds the processing flag for one claim; dropping it always reopens the gate.
struct ProcessingGate<'a> {
    state: &'a QueueState,
}

impl<'a> ProcessingGate<'a> {
    fn acquire(state: &'a QueueState) -> Self {
        state.processing.store(true, Ordering::SeqCst);
        Self { state }
    }
}

impl Drop for ProcessingGate<'_> {
    fn drop(&mut self) {
        self.state.processing.store(false, Ordering::SeqCst);
        self.state.release();
    }
}

/// Handle to the pacing worker. Cloning shares the same queue.
#[derive(Debug, Clone)]
pub struct ClaimPacingQueue {
    sender: mpsc::UnboundedSender<ClaimTask>,
    state: Arc<QueueState>,
    max_depth: Option<usize>,
}

impl ClaimPacingQueue {
    /// Start the worker task. Must be called from inside a tokio runtime.
    #[must_use]
    pub fn spawn(
        transport: Arc<dyn ChatTransport>,
        follow_up: Option<FollowUpResponder>,
        jitter: Jitter,
        config: PacingConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let state = Arc::new(QueueState::default());
        let max_depth = config.max_depth;
        let worker = ClaimWorker {
            transport,
            follow_up,
            jitter,
            config,
            state: Arc::clone(&state),
        };
        tokio::spawn(Arc::new(worker).run(receiver));
        Self {
            sender,
            state,
            max_depth,
        }
    }

    /// Append a claim to the tail of the queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Full`] when a depth cap is configured and reached,
    /// or [`QueueError::Closed`] if the worker task is gone.
    pub fn enqueue(&self, task: ClaimTask) -> Result<(), QueueError> {
        let depth = self.state.depth.fetch_add(1, Ordering::SeqCst);
        if let Some(max) = self.max_depth
            && depth >= max
        {
            self.state.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Full { depth });
        }
        if self.sender.send(task).is_err() {
            self.state.release();
            return Err(QueueError::Closed);
        }
        Ok(())
    }

    /// Claims queued or still running (including the post-claim buffer).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.state.depth.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.state.processing.load(Ordering::SeqCst)
    }

    /// Resolve once every enqueued claim has finished its buffer.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.state.idle.notified();
            if self.depth() == 0 {
                return;
            }
            notified.await;
        }
    }
}

struct ClaimWorker {
    transport: Arc<dyn ChatTransport>,
    follow_up: Option<FollowUpResponder>,
    jitter: Jitter,
    config: PacingConfig,
    state: Arc<QueueState>,
}

impl ClaimWorker {
    async fn run(self: Arc<Self>, mut receiver: mpsc::UnboundedReceiver<ClaimTask>) {
        while let Some(task) = receiver.recv().await {
            let gate = ProcessingGate::acquire(&self.state);
            let buffer = self.config.buffer_after(&task);
            let claim_id = task.claim_id.clone();

            // Run the claim in its own task so a panicking transport cannot take the worker down.
            match tokio::spawn(Arc::clone(&self).execute(task)).await {
                Ok(Ok(())) => log::info!("Sent claim {claim_id}"),
                Ok(Err(err)) => log::error!("Error during card claiming for {claim_id}: {err}"),
                Err(err) => log::error!("Claim {claim_id} aborted: {err}"),
            }

            tokio::time::sleep(buffer).await;
            drop(gate);
        }
        log::debug!("Claim worker stopped");
    }

    async fn execute(self: Arc<Self>, task: ClaimTask) -> Result<(), TransportError> {
        tokio::time::sleep(task.configured_delay()).await;
        self.transport.send_typing(&task.chat_id).await?;
        let typing = self
            .jitter
            .delay(self.config.typing_base_ms, self.config.typing_spread_ms);
        tokio::time::sleep(typing).await;
        self.transport
            .send_text(&task.chat_id, &task.command())
            .await?;
        self.schedule_follow_up(&task.chat_id);
        Ok(())
    }

    fn schedule_follow_up(&self, chat_id: &str) {
        let Some(responder) = self.follow_up.clone() else {
            return;
        };
        if !self.jitter.chance(self.config.follow_up_chance) {
            log::debug!("Skipping follow-up message in {chat_id}");
            return;
        }
        let delay = self.jitter.between(
            self.config.follow_up_delay_min_ms,
            self.config.follow_up_delay_max_ms,
        );
        log::debug!("Will send follow-up message after {}ms", delay.as_millis());
        let chat_id = chat_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = responder.send(&chat_id).await {
                log::error!("Error during random response in {chat_id}: {err}");
            }
        });
    }
}
