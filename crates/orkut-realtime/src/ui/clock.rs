//! Elapsed-time counter for the active call.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

use crate::call::CallState;

const TICK: Duration = Duration::from_secs(1);

/// Counts whole seconds while the call is active; reads 0 otherwise.
#[derive(Debug)]
pub struct CallClock {
    elapsed: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl CallClock {
    /// Starts following `state`.
    pub fn spawn(state: watch::Receiver<CallState>) -> Self {
        let (tx, elapsed) = watch::channel(0);
        let task = tokio::spawn(run(state, tx));
        Self { elapsed, task }
    }

    pub fn elapsed(&self) -> u64 {
        *self.elapsed.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.elapsed.clone()
    }
}

impl Drop for CallClock {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(mut state: watch::Receiver<CallState>, elapsed: watch::Sender<u64>) {
    loop {
        if !state.borrow_and_update().is_call_active {
            elapsed.send_replace(0);
            if state.changed().await.is_err() {
                return;
            }
            continue;
        }

        let mut ticker = interval_at(Instant::now() + TICK, TICK);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    elapsed.send_modify(|s| *s += 1);
                }
                changed = state.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if !state.borrow().is_call_active {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::CallStatus;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_counts_while_active_and_resets() {
        let (tx, rx) = watch::channel(CallState::default());
        let clock = CallClock::spawn(rx);

        sleep(Duration::from_millis(2500)).await;
        assert_eq!(clock.elapsed(), 0);

        tx.send_modify(|s| {
            s.status = CallStatus::Connected;
            s.is_call_active = true;
        });
        sleep(Duration::from_millis(3500)).await;
        assert_eq!(clock.elapsed(), 3);

        // Unrelated changes keep the count.
        tx.send_modify(|s| s.is_muted = true);
        sleep(Duration::from_millis(1000)).await;
        assert_eq!(clock.elapsed(), 4);

        tx.send_modify(|s| *s = CallState::default());
        sleep(Duration::from_millis(10)).await;
        assert_eq!(clock.elapsed(), 0);
    }
}
