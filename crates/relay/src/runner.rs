//! Background runner: drives the outbox processor on a fixed interval.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::processor::OutboxPass;

/// Creates the shutdown signal shared by the runner and its owner.
///
/// Send `true` to stop the runner. Dropping the sender stops it as well.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Periodically runs an outbox pass until shut down.
///
/// Every iteration builds a fresh pass through `factory`, runs it, then
/// sleeps for `interval`. Pass errors are logged and the loop carries on
/// after the usual interval. Shutdown is checked before each pass and
/// interrupts the sleep; a pass in progress is allowed to finish.
pub struct BackgroundRunner<F> {
    factory: F,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl<F, P> BackgroundRunner<F>
where
    F: Fn() -> P + Send + Sync + 'static,
    P: OutboxPass + 'static,
{
    pub fn new(factory: F, interval: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            factory,
            interval,
            shutdown,
        }
    }

    /// Spawns the loop onto the current tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs the loop until shutdown is signalled.
    pub async fn run(mut self) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "outbox runner started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let pass = (self.factory)();
            match pass.execute().await {
                Ok(summary) if !summary.is_idle() => {
                    tracing::info!(
                        selected = summary.selected,
                        processed = summary.processed,
                        failed = summary.failed,
                        "outbox pass finished"
                    );
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::error!(error = %err, "outbox pass failed");
                }
            }

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                changed = self.shutdown.changed() => {
                    // Err means every sender is gone.
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("outbox runner stopped");
    }
}
