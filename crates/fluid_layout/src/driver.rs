//! Async signal loop feeding host events into a [`LayoutEngine`].
//!
//! All engine work still happens synchronously inside the loop body; the
//! loop only waits for the next signal or for the pending resize deadline.

use crate::orchestrator::{LayoutEngine, PassOutcome};
use box_tree::{BoxKey, Metrics, TreeUpdate};
use log::{debug, trace, warn};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

/// A notification from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSignal {
    /// The window was resized.
    Resize,
    /// The user clicked the given box.
    Click(BoxKey),
    /// A batch of structural or attribute changes to mirror.
    Updates(Vec<TreeUpdate>),
    /// Stop driving; a pending resize is dropped.
    Shutdown,
}

/// What a [`drive`] loop did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveReport {
    /// Completed layout passes, from resizes and update batches.
    pub passes: usize,
    /// Passes skipped because the viewport was degenerate.
    pub skipped: usize,
    pub toggles: usize,
    pub update_batches: usize,
    /// Signals that failed and were dropped.
    pub errors: usize,
    /// Resize requests superseded before their pass ran.
    pub coalesced: u64,
}

impl DriveReport {
    fn record(&mut self, outcome: &PassOutcome) {
        match outcome {
            PassOutcome::Completed(_) => self.passes += 1,
            PassOutcome::Skipped(_) => self.skipped += 1,
        }
    }
}

/// Drive `engine` from `signals` until shutdown or until every sender is dropped.
///
/// Resizes are coalesced by the engine's scheduler and run once their
/// deadline passes; clicks toggle immediately; update batches are mirrored
/// and followed by an immediate full pass.
pub async fn drive<M: Metrics>(
    engine: &mut LayoutEngine<M>,
    mut signals: mpsc::Receiver<HostSignal>,
) -> DriveReport {
    let mut report = DriveReport::default();
    let before = engine.superseded_resizes();

    loop {
        let signal = match engine.resize_deadline() {
            Some(deadline) => {
                select! {
                    signal = signals.recv() => signal,
                    () = sleep_until(Instant::from_std(deadline)) => {
                        if let Some(outcome) = engine.poll(Instant::now().into_std()) {
                            report.record(&outcome);
                        }
                        continue;
                    }
                }
            }
            None => signals.recv().await,
        };
        let Some(signal) = signal else {
            debug!("Host signal channel closed");
            break;
        };

        match signal {
            HostSignal::Resize => engine.trigger_resize(Instant::now().into_std()),
            HostSignal::Click(target) => match engine.handle_click(target) {
                Ok(Some(state)) => {
                    trace!("Click on {target:?} toggled a row to {state:?}");
                    report.toggles += 1;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!("Failed to handle click on {target:?}: {err}");
                    report.errors += 1;
                }
            },
            HostSignal::Updates(batch) => match engine.apply_updates(batch) {
                Ok(()) => {
                    report.update_batches += 1;
                    let outcome = engine.run_full_layout_pass();
                    report.record(&outcome);
                }
                Err(err) => {
                    warn!("Failed to apply host updates: {err}");
                    report.errors += 1;
                }
            },
            HostSignal::Shutdown => break,
        }
    }

    if engine.resize_deadline().is_some() {
        debug!("Dropping pending resize pass on shutdown");
    }
    report.coalesced = engine.superseded_resizes().saturating_sub(before);
    report
}
