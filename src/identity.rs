use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::api::{ApiError, Calls, LeaderboardEntry, LeaderboardQuery};
use crate::tracks::TrackRegistry;

/// Possible errors when resolving a player's identity.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The user input is empty or malformed. Never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// There is no record at the requested rank.
    #[error("no record at rank {rank} on track '{track_id}'")]
    NotFound { track_id: String, rank: u32 },

    /// The lookup failed, but might succeed when repeated.
    #[error("leaderboard request failed: {0}")]
    Network(#[from] ApiError),
}

/// The ways a player can be identified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IdentityInput<'a> {
    /// The secret user token, which is hashed to get the player's ID.
    Token(&'a str),

    /// Whoever holds this rank on this track.
    Rank { rank: i64, track_id: &'a str },

    /// The player ID itself.
    RawId(&'a str),
}

/// The canonical ID of a player, with their profile if it could be found.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Identity {
    pub player_id: String,
    pub profile: Option<PlayerProfile>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PlayerProfile {
    pub name: String,
    pub car_colors: String,

    /// Whether this player can verify records, or `None` if unknown.
    pub is_verifier: Option<bool>,
}

impl From<&LeaderboardEntry> for PlayerProfile {
    fn from(entry: &LeaderboardEntry) -> Self {
        PlayerProfile {
            name: entry.name.clone(),
            car_colors: entry.car_colors.clone(),
            is_verifier: None,
        }
    }
}

/// The player ID for a user token: its SHA-256 hash as lowercase hex.
pub fn player_id_from_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn is_player_id(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Turns user input into a player ID.
#[derive(Clone)]
pub struct IdentityResolver {
    api: Arc<dyn Calls>,
    tracks: Arc<TrackRegistry>,
}

impl IdentityResolver {
    pub fn new(api: &Arc<dyn Calls>, tracks: &Arc<TrackRegistry>) -> Self {
        IdentityResolver {
            api: api.clone(),
            tracks: tracks.clone(),
        }
    }

    /// Resolve the player ID, and try to find their profile.
    ///
    /// Only the rank lookup can fail after the input was validated:
    /// failing to find a profile is not an error.
    pub async fn resolve(&self, input: IdentityInput<'_>) -> Result<Identity, ResolveError> {
        match input {
            IdentityInput::Token(token) => {
                // the token is hashed as given, surrounding whitespace included
                if token.trim().is_empty() {
                    return Err(ResolveError::InvalidInput("empty user token".to_string()));
                }
                let player_id = player_id_from_token(token);
                let profile = match self.token_profile(token).await {
                    Some(profile) => Some(profile),
                    None => self.scan_profile(&player_id).await,
                };
                Ok(Identity { player_id, profile })
            }

            IdentityInput::Rank { rank, track_id } => {
                let track_id = track_id.trim();
                if track_id.is_empty() {
                    return Err(ResolveError::InvalidInput(
                        "a rank lookup requires a track".to_string(),
                    ));
                }
                if rank < 1 || rank > u32::MAX as i64 {
                    return Err(ResolveError::InvalidInput(format!(
                        "rank must be positive, got {}",
                        rank
                    )));
                }
                let rank = rank as u32;
                let entry = self.entry_at_rank(track_id, rank).await?;
                Ok(Identity {
                    player_id: entry.user_id.clone(),
                    profile: Some(PlayerProfile::from(&entry)),
                })
            }

            IdentityInput::RawId(id) => {
                let id = id.trim().to_ascii_lowercase();
                if !is_player_id(&id) {
                    return Err(ResolveError::InvalidInput(format!(
                        "'{}' is not a player ID (64 hex digits)",
                        id
                    )));
                }
                let profile = self.scan_profile(&id).await;
                Ok(Identity {
                    player_id: id,
                    profile,
                })
            }
        }
    }

    async fn entry_at_rank(&self, track_id: &str, rank: u32) -> Result<LeaderboardEntry, ResolveError> {
        let not_found = || ResolveError::NotFound {
            track_id: track_id.to_string(),
            rank,
        };

        let query = LeaderboardQuery::slice(track_id, rank - 1, 1);
        let page = match self.api.leaderboard(&query).await {
            Ok(page) => page,
            Err(ApiError::NotFound) => return Err(not_found()),
            Err(err) => return Err(err.into()),
        };

        page.entries.into_iter().next().ok_or_else(not_found)
    }

    async fn token_profile(&self, token: &str) -> Option<PlayerProfile> {
        match self.api.user(token).await {
            Ok(user) => Some(PlayerProfile {
                name: user.name,
                car_colors: user.car_colors,
                is_verifier: Some(user.is_verifier),
            }),
            Err(err) => {
                log::warn!("cannot fetch profile for user token: {}", err);
                None
            }
        }
    }

    /// Look up the player on one track after another, until one
    /// of them has a record of that player.
    async fn scan_profile(&self, player_id: &str) -> Option<PlayerProfile> {
        for track in self.tracks.iter() {
            let query = LeaderboardQuery::player(&track.id, player_id);
            match self.api.leaderboard(&query).await {
                Ok(page) => {
                    if let Some(entry) = page.user_entry {
                        log::debug!("found profile of {} on '{}'", player_id, track.name);
                        return Some(PlayerProfile::from(&entry));
                    }
                }
                Err(err) if err.is_not_found() => {}
                Err(err) => log::warn!("profile lookup on '{}' failed: {}", track.name, err),
            }
        }
        log::info!("player {} has no record on any track", player_id);
        None
    }
}

#[cfg(test)]
mod test {
    use crate::api::mock::*;
    use crate::api::UserProfile;
    use crate::tracks::TrackDescriptor;
    use crate::tracks::Category;

    use super::*;

    const ALICE: &str = "alice-token";

    fn resolver(api: MockApi) -> (IdentityResolver, Arc<MockApi>) {
        let api = Arc::new(api);
        let tracks = Arc::new(TrackRegistry::new(vec![
            TrackDescriptor::new("t1", "One", Category::Official),
            TrackDescriptor::new("t2", "Two", Category::Community),
        ]));
        let calls = api.clone() as Arc<dyn Calls>;
        (IdentityResolver::new(&calls, &tracks), api)
    }

    #[test]
    fn token_hash_is_deterministic() {
        assert_eq!(player_id_from_token(ALICE), player_id_from_token(ALICE));
        assert_ne!(player_id_from_token(ALICE), player_id_from_token("bob"));
        assert_eq!(
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824",
            player_id_from_token("hello")
        );
    }

    #[tokio::test]
    async fn token_with_profile() {
        let profile = UserProfile {
            name: "Alice".to_string(),
            car_colors: "00ff00".to_string(),
            is_verifier: true,
        };
        let (resolver, _) = resolver(MockApi::new().with_user(ALICE, profile));

        let identity = resolver.resolve(IdentityInput::Token(ALICE)).await.unwrap();
        assert_eq!(player_id_from_token(ALICE), identity.player_id);
        let profile = identity.profile.unwrap();
        assert_eq!("Alice", profile.name);
        assert_eq!(Some(true), profile.is_verifier);
    }

    #[tokio::test]
    async fn token_profile_falls_back_to_scan() {
        let id = player_id_from_token(ALICE);
        let api = MockApi::new()
            .with_board("t1", vec![entry("x", "Other", 1000, true)])
            .with_board("t2", vec![entry(&id, "Alice", 2000, false)]);
        let (resolver, _) = resolver(api);

        let identity = resolver.resolve(IdentityInput::Token(ALICE)).await.unwrap();
        let profile = identity.profile.unwrap();
        assert_eq!("Alice", profile.name);
        assert_eq!(None, profile.is_verifier);
    }

    #[tokio::test]
    async fn empty_token_is_invalid() {
        let (resolver, _) = resolver(MockApi::new());
        let res = resolver.resolve(IdentityInput::Token("  ")).await;
        assert!(matches!(res, Err(ResolveError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn token_is_hashed_as_given() {
        let profile = UserProfile {
            name: "Alice".to_string(),
            car_colors: "00ff00".to_string(),
            is_verifier: false,
        };
        let padded = " alice-token\n";
        let (resolver, api) = resolver(MockApi::new().with_user(padded, profile));

        let identity = resolver.resolve(IdentityInput::Token(padded)).await.unwrap();
        assert_eq!(player_id_from_token(padded), identity.player_id);
        assert_ne!(player_id_from_token(ALICE), identity.player_id);
        assert_eq!("Alice", identity.profile.unwrap().name);
        assert_eq!(1, api.calls(padded, CallKind::User));
    }

    #[tokio::test]
    async fn rank_one_of_one() {
        let api = MockApi::new().with_board("t1", vec![entry("only", "Solo", 1000, true)]);
        let (resolver, _) = resolver(api);

        let identity = resolver
            .resolve(IdentityInput::Rank {
                rank: 1,
                track_id: "t1",
            })
            .await
            .unwrap();
        assert_eq!("only", identity.player_id);
        assert_eq!("Solo", identity.profile.unwrap().name);
    }

    #[tokio::test]
    async fn rank_out_of_range() {
        let api = MockApi::new().with_board("t1", vec![entry("only", "Solo", 1000, true)]);
        let (resolver, _) = resolver(api);

        let res = resolver
            .resolve(IdentityInput::Rank {
                rank: 2,
                track_id: "t1",
            })
            .await;
        assert!(matches!(res, Err(ResolveError::NotFound { rank: 2, .. })));
    }

    #[tokio::test]
    async fn non_positive_rank_is_invalid() {
        let (resolver, api) = resolver(MockApi::new());
        for rank in &[0, -3] {
            let res = resolver
                .resolve(IdentityInput::Rank {
                    rank: *rank,
                    track_id: "t1",
                })
                .await;
            assert!(matches!(res, Err(ResolveError::InvalidInput(_))));
        }
        assert_eq!(0, api.calls("t1", CallKind::Slice));
    }

    #[tokio::test]
    async fn rank_lookup_network_error() {
        let api = MockApi::new().with_board("t1", vec![entry("only", "Solo", 1000, true)]);
        api.fail_times("t1", CallKind::Slice, 1);
        let (resolver, _) = resolver(api);

        let res = resolver
            .resolve(IdentityInput::Rank {
                rank: 1,
                track_id: "t1",
            })
            .await;
        assert!(matches!(res, Err(ResolveError::Network(_))));
    }

    #[tokio::test]
    async fn raw_id_must_be_hash() {
        let (resolver, _) = resolver(MockApi::new());
        let res = resolver.resolve(IdentityInput::RawId("not-a-hash")).await;
        assert!(matches!(res, Err(ResolveError::InvalidInput(_))));

        let id = player_id_from_token(ALICE).to_uppercase();
        let identity = resolver.resolve(IdentityInput::RawId(&id)).await.unwrap();
        assert_eq!(player_id_from_token(ALICE), identity.player_id);
        assert_eq!(None, identity.profile);
    }
}
