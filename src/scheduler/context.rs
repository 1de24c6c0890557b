//! Bot thread lifecycle: spawn per round, cooperative teardown with a grace period

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::util::time::Timer;

use super::control::BotControl;
use super::turn::{CancellationToken, TurnGate};
use super::{BotBehavior, BotError, Shared};

/// The thread running user code for one round
#[derive(Debug)]
pub struct ExecutionContext {
    round: u32,
    token: CancellationToken,
    /// Disconnects when the thread exits
    done: mpsc::Receiver<()>,
    handle: JoinHandle<()>,
}

impl ExecutionContext {
    pub(crate) fn spawn(
        round: u32,
        shared: Arc<Shared>,
        behavior: Arc<dyn BotBehavior>,
    ) -> io::Result<Self> {
        let token = CancellationToken::new();
        let (done_tx, done) = mpsc::channel::<()>();
        let control = BotControl::new(shared, token.clone());

        let handle = thread::Builder::new()
            .name(format!("bot-round-{round}"))
            .spawn(move || {
                let _done = done_tx;
                run_to_completion(behavior.as_ref(), &control, round);
            })?;

        info!(round, "Bot execution context started");
        Ok(Self {
            round,
            token,
            done,
            handle,
        })
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Cancel the thread and wait up to `grace` for it to unwind.
    ///
    /// A thread still running after the grace period is detached and left to
    /// observe its token on its own; it can no longer commit turns.
    pub fn teardown(self, gate: &TurnGate, grace: Duration, reason: &'static str) {
        let timer = Timer::new();
        self.token.cancel();
        gate.wake();

        match self.done.recv_timeout(grace) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.handle.join().is_err() {
                    error!(round = self.round, "Bot thread panicked during teardown");
                }
                debug!(
                    round = self.round,
                    reason,
                    elapsed_ms = timer.elapsed_ms(),
                    "Bot execution context stopped"
                );
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    round = self.round,
                    reason,
                    grace_ms = grace.as_millis() as u64,
                    "Bot thread unresponsive to cancellation, detaching"
                );
            }
        }
    }
}

fn run_to_completion(behavior: &dyn BotBehavior, control: &BotControl, round: u32) {
    match panic::catch_unwind(AssertUnwindSafe(|| behavior.run(control))) {
        Ok(Ok(())) => debug!(round, "Bot behavior finished"),
        Ok(Err(BotError::NotRunning)) => debug!(round, "Bot behavior cancelled"),
        Ok(Err(e)) => warn!(round, error = %e, "Bot behavior returned an error"),
        Err(_) => error!(round, "Bot behavior panicked"),
    }

    // Keep the peer fed with empty turns until the round tears us down
    while control.go().is_ok() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::protocol::BotIntent;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn shared() -> Arc<Shared> {
        Arc::new(Shared::new(
            &SchedulerConfig::default(),
            Box::new(|_: BotIntent| {}),
        ))
    }

    #[test]
    fn teardown_releases_a_waiting_thread() {
        let shared = shared();
        let behavior: Arc<dyn BotBehavior> =
            Arc::new(|bot: &BotControl| -> Result<(), BotError> {
                loop {
                    bot.go()?;
                }
            });

        let context = ExecutionContext::spawn(1, shared.clone(), behavior).unwrap();
        assert_eq!(context.round(), 1);

        let timer = Timer::new();
        context.teardown(&shared.gate, Duration::from_secs(5), "test");
        assert!(timer.elapsed_ms() < 5_000);
    }

    #[test]
    fn finished_behavior_keeps_committing_turns() {
        let sent = Arc::new(AtomicUsize::new(0));
        let shared = {
            let sent = sent.clone();
            Arc::new(Shared::new(
                &SchedulerConfig::default(),
                Box::new(move |_: BotIntent| {
                    sent.fetch_add(1, Ordering::SeqCst);
                }),
            ))
        };
        let behavior: Arc<dyn BotBehavior> =
            Arc::new(|_: &BotControl| -> Result<(), BotError> { Ok(()) });

        let context = ExecutionContext::spawn(2, shared.clone(), behavior).unwrap();
        for _ in 0..3 {
            // Wait for the thread to commit, then release it
            while sent.load(Ordering::SeqCst) <= shared.gate.sequence() as usize {
                thread::yield_now();
            }
            shared.gate.advance();
        }
        context.teardown(&shared.gate, Duration::from_secs(5), "test");
        assert!(sent.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn panicking_behavior_is_contained() {
        let shared = shared();
        let behavior: Arc<dyn BotBehavior> =
            Arc::new(|_: &BotControl| -> Result<(), BotError> { panic!("boom") });

        let context = ExecutionContext::spawn(3, shared.clone(), behavior).unwrap();
        context.teardown(&shared.gate, Duration::from_secs(5), "test");
    }
}
