use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::{broadcast, Mutex, RwLockReadGuard};
use tokio::task::AbortHandle;
use tokio::time::sleep;

use crate::api::Calls;
use crate::config::RetryConfig;
use crate::controller::sweep::{spawn_sweep, SweepHandle};
use crate::controller::{FetchOutcome, LiveOutcomes, OutcomeSnapshot, OutcomeStore, RecordFetcher};
use crate::event::OutcomeDiff;
use crate::tracks::TrackRegistry;

/// Resolves a player's records on every track, and keeps re-attempting
/// the tracks that failed in the background.
///
/// Starting a new resolution supersedes the previous one: its pending
/// fetches are cancelled, and late results are discarded.
#[derive(Clone)]
pub struct ResolutionController {
    fetcher: RecordFetcher,
    tracks: Arc<TrackRegistry>,
    retry: RetryConfig,
    store: OutcomeStore,
    run: Arc<Mutex<Option<RunHandles>>>,
}

struct RunHandles {
    generation: u64,
    fan_out: AbortHandle,
    sweep: SweepHandle,
    /// Re-attempts scheduled by the sweep.
    retries: Vec<AbortHandle>,
}

impl RunHandles {
    fn stop(self) {
        self.fan_out.abort();
        self.sweep.stop();
        for retry in self.retries {
            retry.abort();
        }
    }
}

impl ResolutionController {
    pub fn new(api: &Arc<dyn Calls>, tracks: &Arc<TrackRegistry>, retry: &RetryConfig) -> Self {
        ResolutionController {
            fetcher: RecordFetcher::new(api, retry),
            tracks: tracks.clone(),
            retry: retry.clone(),
            store: OutcomeStore::new(),
            run: Arc::new(Mutex::new(None)),
        }
    }

    pub fn tracks(&self) -> &Arc<TrackRegistry> {
        &self.tracks
    }

    pub fn fetcher(&self) -> &RecordFetcher {
        &self.fetcher
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Receive every outcome change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<OutcomeDiff> {
        self.store.subscribe()
    }

    /// Look up the player on every track, and wait until every track has
    /// an outcome. Failed tracks are then re-attempted in the background,
    /// until `stop` is called, or another resolution is started.
    pub async fn resolve_all_tracks(&self, player_id: &str) -> OutcomeSnapshot {
        let fan_out = {
            let mut run = self.run.lock().await;
            if let Some(prev) = run.take() {
                prev.stop();
            }

            let generation = self.store.reset(Some(player_id)).await;
            log::info!(
                "resolving {} tracks for player {} (#{})",
                self.tracks.len(),
                player_id,
                generation
            );

            let controller = self.clone();
            let id = player_id.to_string();
            let fan_out = tokio::spawn(async move { controller.fan_out(generation, &id).await });

            let sweep = spawn_sweep(self.clone(), generation, player_id.to_string());
            *run = Some(RunHandles {
                generation,
                fan_out: fan_out.abort_handle(),
                sweep,
                retries: Vec::new(),
            });
            fan_out
        };

        if let Err(err) = fan_out.await {
            log::debug!("resolution for player {} cancelled: {}", player_id, err);
        }
        self.store.snapshot().await
    }

    /// Discard all outcomes, and stop any ongoing resolution.
    pub async fn clear(&self) {
        let mut run = self.run.lock().await;
        if let Some(prev) = run.take() {
            prev.stop();
        }
        self.store.reset(None).await;
    }

    /// Stop any ongoing resolution, but keep its outcomes.
    ///
    /// Tracks with a cancelled re-attempt are reported as failed again.
    pub async fn stop(&self) {
        let mut run = self.run.lock().await;
        if let Some(prev) = run.take() {
            let generation = prev.generation;
            prev.stop();
            let cancelled = self.store.cancel_retries(generation).await;
            if !cancelled.is_empty() {
                log::info!("cancelled re-attempts of {} tracks", cancelled.len());
            }
        }
    }

    /// Re-attempt a failed track right away, even if the background
    /// sweep already gave up on it.
    ///
    /// Returns `None` if the track has not failed.
    pub async fn retry_track(&self, track_id: &str) -> Option<FetchOutcome> {
        let (generation, player_id, retry_count) = self
            .store
            .begin_manual_retry(track_id, self.retry.max_retry_attempts)
            .await?;
        log::info!("re-attempting track {} on request", track_id);
        Some(self.reattempt(generation, &player_id, track_id, retry_count).await)
    }

    async fn fan_out(&self, generation: u64, player_id: &str) {
        let fetches = self
            .tracks
            .iter()
            .map(|track| self.fetch_track(generation, player_id, &track.id));
        join_all(fetches).await;
        log::info!("resolution #{} settled", generation);
    }

    async fn fetch_track(&self, generation: u64, player_id: &str, track_id: &str) {
        sleep(self.retry.stagger()).await;

        let wr = self.fetcher.world_record(track_id).await;
        if !self.store.set_wr_time(generation, track_id, wr).await {
            return;
        }
        let outcome = self.fetcher.record(player_id, track_id, wr).await;
        self.store.settle(generation, track_id, outcome).await;
    }

    /// Mark failed tracks as `Retrying`, and re-attempt each after a random delay.
    ///
    /// Returns `false` if the resolution was superseded.
    pub(super) async fn sweep_once(&self, generation: u64, player_id: &str) -> bool {
        let mut run = self.run.lock().await;
        let handles = match run.as_mut() {
            Some(handles) if handles.generation == generation => handles,
            _ => return false,
        };
        handles.retries.retain(|retry| !retry.is_finished());

        let marked = match self
            .store
            .begin_sweep(generation, self.retry.max_retry_attempts)
            .await
        {
            Some(marked) => marked,
            None => return false,
        };

        for (track_id, retry_count) in marked {
            log::info!(
                "re-attempting track {} ({}/{})",
                track_id,
                retry_count,
                self.retry.max_retry_attempts
            );
            let controller = self.clone();
            let player_id = player_id.to_string();
            let delay = self.retry.sweep_jitter();
            let task = tokio::spawn(async move {
                sleep(delay).await;
                controller
                    .reattempt(generation, &player_id, &track_id, retry_count)
                    .await;
            });
            handles.retries.push(task.abort_handle());
        }
        true
    }

    async fn reattempt(
        &self,
        generation: u64,
        player_id: &str,
        track_id: &str,
        retry_count: u32,
    ) -> FetchOutcome {
        let known_wr = self.store.lock().await.wr_time(track_id);
        let wr = match known_wr {
            Some(wr) => Some(wr),
            None => {
                let wr = self.fetcher.world_record(track_id).await;
                self.store.set_wr_time(generation, track_id, wr).await;
                wr
            }
        };

        let outcome = self
            .fetcher
            .record(player_id, track_id, wr)
            .await
            .with_retry_count(retry_count);
        self.store.settle(generation, track_id, outcome.clone()).await;
        outcome
    }
}

#[async_trait]
impl LiveOutcomes for ResolutionController {
    async fn lock(&self) -> RwLockReadGuard<'_, OutcomeSnapshot> {
        self.store.lock().await
    }
}
