use serde::{Deserialize, Serialize};

/// Parameters of a leaderboard request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaderboardQuery<'a> {
    pub track_id: &'a str,

    /// The number of entries to skip, starting at the top record.
    pub skip: u32,

    /// The number of entries to return after skipping.
    pub amount: u32,

    /// Only consider records that have been verified.
    pub only_verified: bool,

    /// The SHA-256 hash of a player's user token. If set, the response
    /// will contain that player's entry.
    pub user_token_hash: Option<&'a str>,
}

impl<'a> LeaderboardQuery<'a> {
    /// A query for `amount` entries, starting after `skip` entries.
    pub fn slice(track_id: &'a str, skip: u32, amount: u32) -> Self {
        LeaderboardQuery {
            track_id,
            skip,
            amount,
            only_verified: false,
            user_token_hash: None,
        }
    }

    /// A query for the best verified record.
    pub fn top_verified(track_id: &'a str) -> Self {
        LeaderboardQuery {
            only_verified: true,
            ..LeaderboardQuery::slice(track_id, 0, 1)
        }
    }

    /// A query for the entry of a specific player.
    pub fn player(track_id: &'a str, user_token_hash: &'a str) -> Self {
        LeaderboardQuery {
            user_token_hash: Some(user_token_hash),
            ..LeaderboardQuery::slice(track_id, 0, 1)
        }
    }

    pub(crate) fn params(&self, version: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("version", version.to_string()),
            ("trackId", self.track_id.to_string()),
            ("skip", self.skip.to_string()),
            ("amount", self.amount.to_string()),
            ("onlyVerified", self.only_verified.to_string()),
        ];
        if let Some(hash) = self.user_token_hash {
            params.push(("userTokenHash", hash.to_string()));
        }
        params
    }
}

/// A slice of a track's leaderboard.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPage {
    /// The number of records on this track, matching the `only_verified` filter.
    #[serde(default)]
    pub total: u32,

    /// The requested slice, ordered from better to worse.
    #[serde(default)]
    pub entries: Vec<LeaderboardEntry>,

    /// The entry of the player in the query's `user_token_hash`.
    #[serde(default)]
    pub user_entry: Option<LeaderboardEntry>,
}

/// A player's best record on a track.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// The ID of this record's recording.
    pub id: i64,

    /// The SHA-256 hash of the player's user token.
    pub user_id: String,

    /// The player's display name.
    pub name: String,

    /// The player's car colors as concatenated hex colors without `#`.
    #[serde(default)]
    pub car_colors: String,

    /// The race time in milliseconds.
    pub frames: u64,

    /// 0 for unverified, 1 for verified records. Missing in entries
    /// looked up by user token hash.
    #[serde(default)]
    pub verified_state: Option<u8>,

    /// The 1-based position on the track. Only reliably set in `user_entry`.
    #[serde(default)]
    pub position: Option<u32>,
}

/// The profile of a player, as returned for their user token.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,

    #[serde(default)]
    pub car_colors: String,

    /// Whether this player can verify records.
    #[serde(default)]
    pub is_verifier: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_player_lookup() {
        let json = r#"{
            "total": 1834,
            "entries": [],
            "userEntry": {
                "id": 99,
                "userId": "ab12",
                "name": "kart",
                "carColors": "ff0000",
                "frames": 65234,
                "position": 3
            }
        }"#;
        let page: LeaderboardPage = serde_json::from_str(json).unwrap();
        let entry = page.user_entry.unwrap();
        assert_eq!(1834, page.total);
        assert_eq!(Some(3), entry.position);
        assert_eq!(None, entry.verified_state);
        assert_eq!(65234, entry.frames);
    }

    #[test]
    fn parse_empty_page() {
        let page: LeaderboardPage = serde_json::from_str(r#"{"total": 0}"#).unwrap();
        assert!(page.entries.is_empty());
        assert!(page.user_entry.is_none());
    }

    #[test]
    fn parse_negative_time_is_rejected() {
        let json = r#"{"id": 1, "userId": "a", "name": "b", "frames": -5}"#;
        assert!(serde_json::from_str::<LeaderboardEntry>(json).is_err());
    }

    #[test]
    fn query_params() {
        let query = LeaderboardQuery::player("track", "hash");
        let params = query.params("0.5.1");
        assert!(params.contains(&("skip", "0".to_string())));
        assert!(params.contains(&("amount", "1".to_string())));
        assert!(params.contains(&("onlyVerified", "false".to_string())));
        assert!(params.contains(&("userTokenHash", "hash".to_string())));

        let params = LeaderboardQuery::top_verified("track").params("0.5.1");
        assert!(params.contains(&("onlyVerified", "true".to_string())));
        assert!(params.iter().all(|(k, _)| *k != "userTokenHash"));
    }
}
