use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::controller::ResolutionController;

/// Stops the background retry sweep of a resolution.
pub(super) struct SweepHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    pub(super) fn stop(self) {
        if self.stop.send(()).is_err() {
            // the sweep ended on its own
            self.task.abort();
        }
    }
}

/// Periodically re-attempt failed tracks of the given resolution,
/// until it is superseded, or until stopped.
pub(super) fn spawn_sweep(
    controller: ResolutionController,
    generation: u64,
    player_id: String,
) -> SweepHandle {
    let (stop, mut stop_rx) = oneshot::channel::<()>();
    let period = controller.retry_config().sweep_interval();

    let task = tokio::spawn(async move {
        let mut ticks = interval_at(Instant::now() + period, period);
        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    log::debug!("retry sweep of resolution #{} stopped", generation);
                    break;
                }
                _ = ticks.tick() => {
                    if !controller.sweep_once(generation, &player_id).await {
                        log::debug!("retry sweep of resolution #{} superseded", generation);
                        break;
                    }
                }
            }
        }
    });

    SweepHandle { stop, task }
}
