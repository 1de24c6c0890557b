//! Turn gate: the commit-turn primitive the bot thread blocks on

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::BotError;

/// Cooperative cancellation flag shared with one execution context
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Counts fully processed ticks and wakes the bot thread on each one
#[derive(Debug, Default)]
pub struct TurnGate {
    processed: Mutex<u64>,
    advanced: Condvar,
}

impl TurnGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ticks processed so far
    pub fn sequence(&self) -> u64 {
        *self.processed.lock()
    }

    /// Mark the current tick as processed and release waiters
    pub fn advance(&self) {
        let mut processed = self.processed.lock();
        *processed += 1;
        self.advanced.notify_all();
    }

    /// Wake waiters so they re-check their cancellation token
    pub fn wake(&self) {
        let _processed = self.processed.lock();
        self.advanced.notify_all();
    }

    /// Block until a tick newer than `seen` has been processed.
    ///
    /// Returns `NotRunning` as soon as `token` is cancelled, whether before or
    /// during the wait. No other lock may be held by the caller.
    pub fn wait_past(&self, seen: u64, token: &CancellationToken) -> Result<u64, BotError> {
        let mut processed = self.processed.lock();
        loop {
            if token.is_cancelled() {
                return Err(BotError::NotRunning);
            }
            if *processed > seen {
                return Ok(*processed);
            }
            self.advanced.wait(&mut processed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn waiter_is_released_by_advance() {
        let gate = Arc::new(TurnGate::new());
        let token = CancellationToken::new();
        let seen = gate.sequence();

        let waiter = {
            let gate = gate.clone();
            let token = token.clone();
            thread::spawn(move || gate.wait_past(seen, &token))
        };

        thread::sleep(Duration::from_millis(20));
        gate.advance();
        assert_eq!(waiter.join().unwrap(), Ok(1));
    }

    #[test]
    fn already_advanced_returns_immediately() {
        let gate = TurnGate::new();
        gate.advance();
        gate.advance();
        assert_eq!(gate.wait_past(0, &CancellationToken::new()), Ok(2));
    }

    #[test]
    fn cancellation_releases_waiter() {
        let gate = Arc::new(TurnGate::new());
        let token = CancellationToken::new();

        let waiter = {
            let gate = gate.clone();
            let token = token.clone();
            thread::spawn(move || gate.wait_past(0, &token))
        };

        thread::sleep(Duration::from_millis(20));
        token.cancel();
        gate.wake();
        assert_eq!(waiter.join().unwrap(), Err(BotError::NotRunning));
    }
}
