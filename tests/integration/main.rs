use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use polyrank::api::*;
use polyrank::config::{Config, RetryConfig};
use polyrank::controller::*;
use polyrank::identity::*;
use polyrank::stats::*;
use polyrank::tracks::*;

/// A leaderboard service with a fixed set of records.
struct FakeService {
    /// Maps track IDs to (player ID, time, verified) in leaderboard order.
    boards: HashMap<String, Vec<(String, u64, bool)>>,

    /// Requests for this track fail until the counter reaches zero.
    flaky_track: Option<(String, AtomicU32)>,
}

impl FakeService {
    fn new() -> Self {
        FakeService {
            boards: HashMap::new(),
            flaky_track: None,
        }
    }

    fn board(mut self, track_id: &str, records: &[(&str, u64, bool)]) -> Self {
        let mut records: Vec<(String, u64, bool)> = records
            .iter()
            .map(|(p, t, v)| (p.to_string(), *t, *v))
            .collect();
        records.sort_by_key(|r| r.1);
        self.boards.insert(track_id.to_string(), records);
        self
    }

    fn flaky(mut self, track_id: &str, failures: u32) -> Self {
        self.flaky_track = Some((track_id.to_string(), AtomicU32::new(failures)));
        self
    }

    fn to_entry(idx: usize, (player, time, verified): &(String, u64, bool)) -> LeaderboardEntry {
        LeaderboardEntry {
            id: idx as i64,
            user_id: player.clone(),
            name: player.to_uppercase(),
            car_colors: "aabbcc".to_string(),
            frames: *time,
            verified_state: Some(*verified as u8),
            position: Some(idx as u32 + 1),
        }
    }
}

#[async_trait]
impl Calls for FakeService {
    async fn leaderboard(&self, query: &LeaderboardQuery<'_>) -> Result<LeaderboardPage, ApiError> {
        if let Some((track_id, failures)) = &self.flaky_track {
            if track_id == query.track_id && failures.load(Ordering::SeqCst) > 0 {
                failures.fetch_sub(1, Ordering::SeqCst);
                return Err(ApiError::Status(429));
            }
        }

        let board = self.boards.get(query.track_id).ok_or(ApiError::NotFound)?;
        let filtered: Vec<&(String, u64, bool)> = board
            .iter()
            .filter(|r| !query.only_verified || r.2)
            .collect();

        let entries = filtered
            .iter()
            .enumerate()
            .skip(query.skip as usize)
            .take(query.amount as usize)
            .map(|(idx, r)| FakeService::to_entry(idx, r))
            .collect();

        let user_entry = query.user_token_hash.and_then(|hash| {
            filtered
                .iter()
                .position(|r| r.0 == hash)
                .map(|idx| LeaderboardEntry {
                    verified_state: None,
                    ..FakeService::to_entry(idx, filtered[idx])
                })
        });

        Ok(LeaderboardPage {
            total: filtered.len() as u32,
            entries,
            user_entry,
        })
    }

    async fn user(&self, _user_token: &str) -> Result<UserProfile, ApiError> {
        Err(ApiError::NotFound)
    }
}

fn registry() -> Arc<TrackRegistry> {
    Arc::new(TrackRegistry::new(vec![
        TrackDescriptor::new("summer", "Summer 1", Category::Official),
        TrackDescriptor::new("winter", "Winter 1", Category::Official),
        TrackDescriptor::new("arabica", "Arabica", Category::Community),
    ]))
}

fn service() -> FakeService {
    let me = player_id_from_token("my-token");
    let me = me.as_str();

    FakeService::new()
        .board(
            "summer",
            &[
                ("wr", 60000, true),
                ("x", 61000, false),
                (me, 65234, true),
                ("y", 70000, true),
            ],
        )
        .board("winter", &[("wr", 90000, true), ("z", 95000, true)])
        .board("arabica", &[(me, 30000, false), ("wr", 31000, true)])
}

fn setup(service: FakeService) -> (Arc<dyn Calls>, Arc<TrackRegistry>, ResolutionController) {
    let _ = env_logger::builder().is_test(true).try_init();

    let api = Arc::new(service) as Arc<dyn Calls>;
    let tracks = registry();
    let controller = ResolutionController::new(&api, &tracks, &RetryConfig::default());
    (api, tracks, controller)
}

#[tokio::test(start_paused = true)]
async fn test_resolve_by_token() -> Result<()> {
    let (api, tracks, controller) = setup(service());

    let identity = IdentityResolver::new(&api, &tracks)
        .resolve(IdentityInput::Token("my-token"))
        .await?;
    assert_eq!(player_id_from_token("my-token"), identity.player_id);

    // profile comes from the first record found
    let profile = identity.profile.as_ref().expect("profile");
    assert_eq!(identity.player_id.to_uppercase(), profile.name);

    let snapshot = controller.resolve_all_tracks(&identity.player_id).await;
    assert!(snapshot.is_settled(&tracks));

    let summer = snapshot.get("summer").and_then(FetchOutcome::record).expect("record");
    assert_eq!(3, summer.rank);
    assert_eq!(4, summer.total);
    assert_eq!(VerificationState::Verified, summer.verification);
    assert_eq!(Some(5234), summer.wr_time_gap_ms);

    assert_eq!(Some(&FetchOutcome::Absent), snapshot.get("winter"));

    let arabica = snapshot.get("arabica").and_then(FetchOutcome::record).expect("record");
    assert_eq!(1, arabica.rank);
    assert_eq!(Some(-1000), arabica.wr_time_gap_ms);
    assert_eq!(VerificationState::Unverified, arabica.verification);

    controller.stop().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_statistics() -> Result<()> {
    let (_, tracks, controller) = setup(service());
    let player_id = player_id_from_token("my-token");

    let snapshot = controller.resolve_all_tracks(&player_id).await;
    controller.stop().await;

    let stats = aggregate(&snapshot, &tracks);
    let overall = stats.overall.averages.as_ref().expect("averages");
    assert_eq!(2, overall.count);
    assert!((overall.avg_rank.unwrap() - 2.0).abs() < 1e-9);
    assert_eq!(Some(RankMedal::Podium), overall.rank_medal());

    let official = &stats.by_category[&Category::Official];
    assert_eq!(1, official.records.len());
    assert_eq!("summer", official.best_worst.rank.best.unwrap().track.id);

    assert!(stats.overall.medals.contains_key("WR"));
    assert!(stats.overall.medals.contains_key("Podium"));

    let mut rows = track_rows(&snapshot, &tracks, None);
    sort_rows(&mut rows, SortKey::Rank, false);
    let order: Vec<&str> = rows.iter().map(|r| r.track.id.as_str()).collect();
    assert_eq!(vec!["arabica", "summer", "winter"], order);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_track_recovers() -> Result<()> {
    // the world record request, and four record attempts
    let (_, _, controller) = setup(service().flaky("summer", 5));
    let player_id = player_id_from_token("my-token");

    let snapshot = controller.resolve_all_tracks(&player_id).await;
    assert!(snapshot.get("summer").map_or(false, FetchOutcome::is_failed));
    assert_eq!(None, snapshot.wr_time("summer"));

    tokio::time::sleep(Duration::from_secs(10)).await;

    let snapshot = controller.snapshot().await;
    let summer = snapshot.get("summer").and_then(FetchOutcome::record).expect("record");
    assert_eq!(3, summer.rank);
    assert_eq!(Some(60000), summer.wr_time_ms);

    controller.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_resolve_by_rank() -> Result<()> {
    let (api, tracks, _) = setup(service());
    let resolver = IdentityResolver::new(&api, &tracks);

    let identity = resolver
        .resolve(IdentityInput::Rank {
            rank: 2,
            track_id: "winter",
        })
        .await?;
    assert_eq!("z", identity.player_id);

    let err = resolver
        .resolve(IdentityInput::Rank {
            rank: 3,
            track_id: "winter",
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::NotFound { rank: 3, .. }));
    Ok(())
}

#[tokio::test]
async fn test_browse_pages() -> Result<()> {
    let (_, _, controller) = setup(service());
    let view = controller
        .fetcher()
        .fetch_page("summer", 1, true, Some("y"))
        .await?;
    assert_eq!(3, view.total);
    assert_eq!(1, view.total_pages);
    assert_eq!(Some(2), view.highlight);
    assert_eq!(1, page_of(view.records[2].rank));
    Ok(())
}

#[test]
fn test_default_config() {
    let config = Config::default();
    assert!(polyrank::config::check_config(&config).is_ok());

    let tracks = TrackRegistry::builtin(&config.extra_tracks);
    assert_eq!(37, tracks.len());
}
