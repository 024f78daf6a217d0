//! Runs a [`Host`] on its own thread, driven by real time.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use beacon_core::{CorrelatorConfig, CorrelatorView, InteractionRecord, Signal};
use beacon_logging::{beacon_debug, beacon_warn};
use thiserror::Error;
use tokio::sync::{mpsc as async_mpsc, oneshot};

use crate::clock::SystemClock;
use crate::collaborators::Collaborators;
use crate::host::Host;
use crate::listeners::Notification;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to build correlator runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

enum Command {
    Signal(Signal),
    View(oneshot::Sender<CorrelatorView>),
    Shutdown,
}

/// Owns the correlator thread. Delivered records can be polled from the handle.
pub struct CorrelatorHandle {
    cmd_tx: async_mpsc::UnboundedSender<Command>,
    record_rx: mpsc::Receiver<InteractionRecord>,
    thread: Option<JoinHandle<()>>,
}

impl CorrelatorHandle {
    pub fn spawn(
        config: CorrelatorConfig,
        mut collaborators: Collaborators,
    ) -> Result<Self, ServiceError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        let (cmd_tx, cmd_rx) = async_mpsc::unbounded_channel();
        let (record_tx, record_rx) = mpsc::channel();

        collaborators
            .listeners
            .subscribe("handle", move |notification: &Notification<'_>| {
                if let Notification::Beacon(record) = notification {
                    let _ = record_tx.send((*record).clone());
                }
            });
        let host = Host::new(config, SystemClock::new(), collaborators);

        let thread = thread::Builder::new()
            .name("beacon-correlator".to_string())
            .spawn(move || runtime.block_on(run(host, cmd_rx)))?;

        Ok(Self {
            cmd_tx,
            record_rx,
            thread: Some(thread),
        })
    }

    /// Queues a signal. Returns false once the correlator thread has stopped.
    pub fn send(&self, signal: Signal) -> bool {
        self.cmd_tx.send(Command::Signal(signal)).is_ok()
    }

    pub fn try_recv(&self) -> Option<InteractionRecord> {
        self.record_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<InteractionRecord> {
        self.record_rx.recv_timeout(timeout).ok()
    }

    /// Snapshot of the correlator after every previously sent signal was processed.
    pub fn view(&self) -> Option<CorrelatorView> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx.send(Command::View(tx)).ok()?;
        rx.blocking_recv().ok()
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                beacon_warn!("correlator thread panicked");
            }
        }
    }
}

impl Drop for CorrelatorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(mut host: Host<SystemClock>, mut cmd_rx: async_mpsc::UnboundedReceiver<Command>) {
    loop {
        let deadline = host
            .next_deadline()
            .map(|at| tokio::time::Instant::from_std(host.clock().instant_at(at)));

        tokio::select! {
            command = cmd_rx.recv() => match command {
                Some(Command::Signal(signal)) => host.dispatch(signal),
                Some(Command::View(reply)) => {
                    let _ = reply.send(host.view());
                }
                Some(Command::Shutdown) | None => break,
            },
            _ = sleep_until(deadline), if deadline.is_some() => {
                host.run_due();
            }
        }
    }
    beacon_debug!("correlator thread stopping");
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(deadline).await;
    }
}
