//! Graceful shutdown signal, installed once at startup and awaited by
//! the event loop alongside its other select branches.

use tokio::sync::watch;

pub struct ShutdownHandler {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl ShutdownHandler {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Installs a Ctrl-C / SIGTERM listener that flips the shared flag
    /// once. Safe to call more than once; each call adds another
    /// listener task feeding the same flag.
    pub async fn install(&self) -> ShutdownWaiter {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            let _ = tx.send(true);
        });
        ShutdownWaiter {
            rx: self.rx.clone(),
        }
    }

    /// Triggers shutdown programmatically (used by the supervisor on a
    /// fatal error, and by tests).
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

impl Default for ShutdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct ShutdownWaiter {
    rx: watch::Receiver<bool>,
}

impl ShutdownWaiter {
    /// Resolves once shutdown has been requested.
    pub async fn wait(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_resolves_wait() {
        let handler = ShutdownHandler::new();
        let mut waiter = ShutdownWaiter {
            rx: handler.rx.clone(),
        };
        handler.trigger();
        waiter.wait().await;
        assert!(waiter.is_requested());
    }
}
