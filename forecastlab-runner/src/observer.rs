//! Training progress observers.
//!
//! The engine calls [`TrainingObserver::on_epoch_end`] once per completed
//! epoch, in epoch order, and [`TrainingObserver::on_train_end`] exactly once
//! after the last epoch of a successful run. Cancelled or failed runs do not
//! reach `on_train_end`.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Metrics of one completed epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochLogs {
    /// Zero-based epoch index.
    pub epoch: usize,
    /// Mean training loss over the epoch.
    pub loss: f64,
    /// Loss on the held-out set, when the run has one.
    pub validation_loss: Option<f64>,
}

pub trait TrainingObserver: Send {
    fn on_epoch_end(&mut self, epoch: usize, logs: &EpochLogs);

    fn on_train_end(&mut self) {}
}

/// Ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TrainingObserver for NoopObserver {
    fn on_epoch_end(&mut self, _epoch: usize, _logs: &EpochLogs) {}
}

/// Emits a `tracing` event every N epochs (and always for the first epoch).
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    every_n_epochs: usize,
    epochs_seen: usize,
}

impl LoggingObserver {
    pub fn new(every_n_epochs: usize) -> Self {
        Self {
            every_n_epochs: every_n_epochs.max(1),
            epochs_seen: 0,
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new(10)
    }
}

impl TrainingObserver for LoggingObserver {
    fn on_epoch_end(&mut self, epoch: usize, logs: &EpochLogs) {
        self.epochs_seen += 1;
        if epoch == 0 || (epoch + 1) % self.every_n_epochs == 0 {
            match logs.validation_loss {
                Some(val) => info!(epoch, loss = logs.loss, val_loss = val, "epoch complete"),
                None => info!(epoch, loss = logs.loss, "epoch complete"),
            }
        }
    }

    fn on_train_end(&mut self) {
        info!(epochs = self.epochs_seen, "training complete");
    }
}

/// Records every epoch for later inspection.
#[derive(Debug, Default, Clone)]
pub struct HistoryObserver {
    pub epochs: Vec<EpochLogs>,
    pub finished: bool,
}

impl HistoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.loss).collect()
    }
}

impl TrainingObserver for HistoryObserver {
    fn on_epoch_end(&mut self, _epoch: usize, logs: &EpochLogs) {
        self.epochs.push(*logs);
    }

    fn on_train_end(&mut self) {
        self.finished = true;
    }
}

/// Adapts a closure into an observer.
pub struct FnObserver<F>(pub F);

impl<F> TrainingObserver for FnObserver<F>
where
    F: FnMut(usize, &EpochLogs) + Send,
{
    fn on_epoch_end(&mut self, epoch: usize, logs: &EpochLogs) {
        (self.0)(epoch, logs)
    }
}

/// Fans notifications out to two observers, first `A` then `B`.
impl<A, B> TrainingObserver for (A, B)
where
    A: TrainingObserver,
    B: TrainingObserver,
{
    fn on_epoch_end(&mut self, epoch: usize, logs: &EpochLogs) {
        self.0.on_epoch_end(epoch, logs);
        self.1.on_epoch_end(epoch, logs);
    }

    fn on_train_end(&mut self) {
        self.0.on_train_end();
        self.1.on_train_end();
    }
}

impl<T: TrainingObserver + ?Sized> TrainingObserver for &mut T {
    fn on_epoch_end(&mut self, epoch: usize, logs: &EpochLogs) {
        (**self).on_epoch_end(epoch, logs)
    }

    fn on_train_end(&mut self) {
        (**self).on_train_end()
    }
}
