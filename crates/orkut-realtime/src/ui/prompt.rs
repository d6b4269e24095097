//! Incoming-call prompt with its auto-reject countdown.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, interval, interval_at};
use tracing::{debug, warn};

use orkut_core::types::{CallType, UserId};

use super::alert::{RING_INTERVAL, RING_PATTERN, RingBurst, RingtonePlayer, Vibrator};

/// Seconds left at which the prompt warns about auto-rejection.
pub const URGENT_THRESHOLD: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptCommand {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptOutcome {
    Accepted,
    Rejected,
    /// The countdown ran out.
    AutoRejected,
}

/// Countdown state for one incoming call. Resolves exactly once.
#[derive(Debug, Clone)]
pub struct IncomingCallPrompt {
    call_id: String,
    caller: UserId,
    caller_name: Option<String>,
    call_type: CallType,
    remaining: u32,
    outcome: Option<PromptOutcome>,
}

impl IncomingCallPrompt {
    pub fn new(
        call_id: impl Into<String>,
        caller: UserId,
        call_type: CallType,
        timeout_seconds: u32,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            caller,
            caller_name: None,
            call_type,
            remaining: timeout_seconds,
            outcome: None,
        }
    }

    pub fn with_caller_name(mut self, name: impl Into<String>) -> Self {
        self.caller_name = Some(name.into());
        self
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn caller(&self) -> UserId {
        self.caller
    }

    pub fn caller_name(&self) -> Option<&str> {
        self.caller_name.as_deref()
    }

    pub fn call_type(&self) -> CallType {
        self.call_type
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn outcome(&self) -> Option<PromptOutcome> {
        self.outcome
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn is_urgent(&self) -> bool {
        !self.is_resolved() && self.remaining <= URGENT_THRESHOLD
    }

    pub fn title(&self) -> &'static str {
        match self.call_type {
            CallType::Video => "Chamada de vídeo",
            CallType::Audio => "Chamada de áudio",
        }
    }

    pub fn warning(&self) -> Option<String> {
        self.is_urgent().then(|| {
            format!(
                "Chamada será rejeitada automaticamente em {}s",
                self.remaining
            )
        })
    }

    /// Advances the countdown by one second. Yields `AutoRejected` on the
    /// tick that reaches zero and nothing afterwards.
    pub fn tick(&mut self) -> Option<PromptOutcome> {
        if self.is_resolved() {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            return self.resolve(PromptOutcome::AutoRejected);
        }
        None
    }

    pub fn accept(&mut self) -> Option<PromptOutcome> {
        self.resolve(PromptOutcome::Accepted)
    }

    pub fn reject(&mut self) -> Option<PromptOutcome> {
        self.resolve(PromptOutcome::Rejected)
    }

    fn resolve(&mut self, outcome: PromptOutcome) -> Option<PromptOutcome> {
        if self.is_resolved() {
            return None;
        }
        self.outcome = Some(outcome);
        Some(outcome)
    }
}

/// Outputs the prompt driver feeds while ringing.
#[derive(Default)]
pub struct PromptAlerts {
    pub ringtone: Option<Arc<dyn RingtonePlayer>>,
    pub vibrator: Option<Arc<dyn Vibrator>>,
    /// Receives the seconds left after every tick.
    pub countdown: Option<watch::Sender<u32>>,
}

impl PromptAlerts {
    fn ring(&self, call_id: &str) {
        if let Some(player) = &self.ringtone {
            let player = player.clone();
            let call_id = call_id.to_string();
            tokio::spawn(async move {
                if let Err(e) = player.play(&RingBurst::default()).await {
                    warn!(call_id = %call_id, error = %e, "Ring tone failed");
                }
            });
        }
        if let Some(vibrator) = &self.vibrator {
            vibrator.vibrate(&RING_PATTERN);
        }
    }

    fn silence(&self) {
        if let Some(vibrator) = &self.vibrator {
            vibrator.stop();
        }
    }
}

/// Drives `prompt` until it resolves: one countdown tick per second, a ring
/// burst and vibration pulse every two seconds. A closed command channel
/// counts as a rejection.
pub async fn run_prompt(
    mut prompt: IncomingCallPrompt,
    mut commands: mpsc::Receiver<PromptCommand>,
    alerts: PromptAlerts,
) -> PromptOutcome {
    let second = Duration::from_secs(1);
    let mut countdown = interval_at(Instant::now() + second, second);
    let mut ring = interval(RING_INTERVAL);

    let outcome = loop {
        tokio::select! {
            command = commands.recv() => {
                let resolved = match command {
                    Some(PromptCommand::Accept) => prompt.accept(),
                    Some(PromptCommand::Reject) | None => prompt.reject(),
                };
                if let Some(outcome) = resolved {
                    break outcome;
                }
            }
            _ = countdown.tick() => {
                if let Some(outcome) = prompt.tick() {
                    break outcome;
                }
                if let Some(tx) = &alerts.countdown {
                    tx.send_replace(prompt.remaining());
                }
            }
            _ = ring.tick() => alerts.ring(prompt.call_id()),
        }
    };

    alerts.silence();
    if let Some(tx) = &alerts.countdown {
        tx.send_replace(prompt.remaining());
    }
    debug!(call_id = %prompt.call_id(), ?outcome, "Incoming call prompt resolved");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use orkut_core::result::AppResult;

    #[derive(Default)]
    struct RecordingVibrator {
        patterns: Mutex<Vec<Vec<u64>>>,
    }

    impl Vibrator for RecordingVibrator {
        fn vibrate(&self, pattern: &[u64]) {
            self.patterns.lock().unwrap().push(pattern.to_vec());
        }
    }

    #[derive(Default)]
    struct CountingPlayer {
        plays: AtomicUsize,
    }

    #[async_trait]
    impl RingtonePlayer for CountingPlayer {
        async fn play(&self, _burst: &RingBurst) -> AppResult<()> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn prompt(timeout: u32) -> IncomingCallPrompt {
        IncomingCallPrompt::new("call_1", UserId::new(), CallType::Audio, timeout)
    }

    #[test]
    fn test_auto_reject_fires_once() {
        let mut p = prompt(2);
        assert_eq!(p.tick(), None);
        assert_eq!(p.tick(), Some(PromptOutcome::AutoRejected));
        assert_eq!(p.tick(), None);
        assert_eq!(p.accept(), None);
        assert_eq!(p.outcome(), Some(PromptOutcome::AutoRejected));
    }

    #[test]
    fn test_explicit_answer_stops_countdown() {
        let mut p = prompt(30);
        assert_eq!(p.accept(), Some(PromptOutcome::Accepted));
        assert_eq!(p.reject(), None);
        for _ in 0..40 {
            assert_eq!(p.tick(), None);
        }
        assert_eq!(p.outcome(), Some(PromptOutcome::Accepted));
    }

    #[test]
    fn test_warning_in_last_ten_seconds() {
        let mut p = prompt(12);
        assert!(p.warning().is_none());
        p.tick();
        p.tick();
        assert_eq!(
            p.warning().as_deref(),
            Some("Chamada será rejeitada automaticamente em 10s")
        );
        assert_eq!(p.title(), "Chamada de áudio");
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_auto_rejects_and_silences() {
        let vibrator = Arc::new(RecordingVibrator::default());
        let player = Arc::new(CountingPlayer::default());
        let (countdown_tx, countdown_rx) = watch::channel(3);
        let (_commands_tx, commands_rx) = mpsc::channel(4);

        let outcome = run_prompt(
            prompt(3),
            commands_rx,
            PromptAlerts {
                ringtone: Some(player.clone()),
                vibrator: Some(vibrator.clone()),
                countdown: Some(countdown_tx),
            },
        )
        .await;

        assert_eq!(outcome, PromptOutcome::AutoRejected);
        assert_eq!(*countdown_rx.borrow(), 0);
        let patterns = vibrator.patterns.lock().unwrap();
        assert_eq!(patterns.first(), Some(&RING_PATTERN.to_vec()));
        assert_eq!(patterns.last(), Some(&vec![0]));
        tokio::task::yield_now().await;
        assert!(player.plays.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_accept_and_closed_channel() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(PromptCommand::Accept).await.unwrap();
        let outcome = run_prompt(prompt(30), rx, PromptAlerts::default()).await;
        assert_eq!(outcome, PromptOutcome::Accepted);

        let (tx, rx) = mpsc::channel(4);
        drop(tx);
        let outcome = run_prompt(prompt(30), rx, PromptAlerts::default()).await;
        assert_eq!(outcome, PromptOutcome::Rejected);
    }
}
