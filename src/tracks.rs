use lazy_static::*;
use serde::{Deserialize, Serialize};

use crate::config::ExtraTrack;

/// Tracks are either part of the game, or were built by the community.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Official,
    Community,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::Official => "Official",
            Category::Community => "Community",
        }
    }
}

/// An independent leaderboard.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    /// The ID the leaderboard service uses for this track.
    pub id: String,

    /// The display name.
    pub name: String,

    pub category: Category,
}

impl TrackDescriptor {
    pub fn new(id: &str, name: &str, category: Category) -> Self {
        TrackDescriptor {
            id: id.to_string(),
            name: name.to_string(),
            category,
        }
    }
}

lazy_static! {
    static ref BUILTIN_TRACKS: Vec<TrackDescriptor> = {
        use Category::*;
        vec![
            TrackDescriptor::new("ef949bfd7492a8b329c30fac19713d9ea96256fb8bf1cdb65cb3727c0205b862", "Summer 1", Official),
            TrackDescriptor::new("cf1ceacd0e3239a44afe8e4c291bd655a80ffffe559964e9a5bc5c3e21c4cafc", "Summer 2", Official),
            TrackDescriptor::new("456a0ac6f849ecf5d4020ade78f4e2e44f3eee3cd21b9452ff8a93e0624dbd2f", "Summer 3", Official),
            TrackDescriptor::new("668c209f6055c04b9f28e37127884039cb1f8710360bfe5b578955295151979f", "Summer 4", Official),
            TrackDescriptor::new("b31551b1fc3cfdf3f76043b82d0c88d92451ae5246ce3db65bc3979e4912d01f", "Summer 5", Official),
            TrackDescriptor::new("b6657496f1f25ab8b1599c4cc7d93b2cecebef9bd018032993f9c2f92a9f2851", "Summer 6", Official),
            TrackDescriptor::new("f3d90e905743a30d4a01ff302be3ae0be38ee055cc1a3b99257752e505765c04", "Summer 7", Official),
            TrackDescriptor::new("94de41605004b67581f7a2a4f68c84d352b5b723a604ccb38e511f5eac9d22a9", "Winter 1", Official),
            TrackDescriptor::new("f84e5f767fc5d53ae0d3ddf95dfb4a9197f361283cdb049673077b0208d12fe8", "Winter 2", Official),
            TrackDescriptor::new("7a0e04bfe09e1bead36ddd2f7e61d32fd6c1e55e907d60edc6ccd3e17532e1f7", "Winter 3", Official),
            TrackDescriptor::new("39b2d610aeed5d193f3346291fc4000ef23030e5817f471522f167b9e74ed1f5", "Winter 4", Official),
            TrackDescriptor::new("56a5e13736d871f92863cb60ad690e78547f459520e61285fde05bd02bd2d349", "Desert 1", Official),
            TrackDescriptor::new("7425633d9f77c41bbf7486fdd2b3a2ce04aa26bacc870a032929b4c7e33a8cf3", "Desert 2", Official),
            TrackDescriptor::new("b84107a25d159c6544092903da12b61573971da5a6b3c917e55be30486ccaddd", "Desert 3", Official),
            TrackDescriptor::new("29b6343e99552c610e24a5bfefc8a240800ed151600c0dc8f5c0f3dce334d322", "Desert 4", Official),
            TrackDescriptor::new("b7b253d6b0cc2ce8e6d5fe51cd3365bde09ad5de4e12256128e9b6493969085c", "Asgaurdia", Community),
            TrackDescriptor::new("da1ef837b8412d32269e305d4031c47b59da08fca2b856d94890eaf58ec29b71", "Flying Dreams", Community),
            TrackDescriptor::new("7537816191920c597d6a1f0ab03b50c4ae3d74b6e0f6eeb8ddb85653762c7a5d", "Ghost City", Community),
            TrackDescriptor::new("fa1a61bb25e8a5a68f2b30fffe9ca3bdd448f4a5c249f8b2403b4f5323b6de45", "MOS ESPA", Community),
            TrackDescriptor::new("a054a6277181a7f0a46588f5cccd1b794f537e5efd09a173a9ca7e11d511f304", "NatsujŌ", Community),
            TrackDescriptor::new("4d0f964b159d51d6906478bbb87e1edad21b0f1eb2972af947be34f2d8c49ae9", "90xRESET", Community),
            TrackDescriptor::new("0544f97453f7b0e2a310dfb0dcd331b4060ae2e9cb14ac27dc5367183dab0513", "concrete jungle", Community),
            TrackDescriptor::new("2ccd83e9419b6071ad9272b73e549e427b1a0f62d5305015839ae1e08fb86ce6", "lu muvimento", Community),
            TrackDescriptor::new("f112ab979138b9916221cbf46329fa7377a745bdd18cd3d00b4ffd6a8a68f113", "Re : Akina", Community),
            TrackDescriptor::new("b41ac84904b60d00efa5ab8bb60f42c929c16d8ebbfe2f77126891fcddab9c1c", "Hyperion's Sanctuary", Community),
            TrackDescriptor::new("89f1a70d0e6be8297ec340a378b890f3fed7d0e20e3ef15b5d32ef4ef7ff1701", "Opal Palace - Repolished", Community),
            TrackDescriptor::new("2978b99f058cb3a2ce6f97c435c803b8d638400532d7c79028b2ec3d5e093882", "Snow Park", Community),
            TrackDescriptor::new("2046c377ac7ec5326b263c46587f30b66ba856257ddc317a866e3e7f66a73929", "Winter Hollow", Community),
            TrackDescriptor::new("b453c3afb4b5872213aee43249d6db38578e8e2ded4a96f840617c9c6e63a6b6", "Anubis", Community),
            TrackDescriptor::new("23a46c3d4978a72be5f4a7fea236797aa31b52e577044ef4c9faa822ecc5cdc0", "Joenail Jones", Community),
            TrackDescriptor::new("1aadcef252749318227d5cd4ce61a4a71526087857104fd57697b6fc63102e8a", "Arabica", Community),
            TrackDescriptor::new("773eb0b02b97a72f3e482738cda7a5292294800497e16d9366e4f4c88a6f4e2d", "Clay temples", Community),
            TrackDescriptor::new("932da81567f2b223fa1a52d88d6db52016600c5b9df02218f06c9eb832ecddeb", "DESERT STALLION", Community),
            TrackDescriptor::new("97da746d9b3ddd5a861fa8da7fcb6f6402ffa21f8f5cf61029d7a947bad76290", "Las Calles", Community),
            TrackDescriptor::new("19335bb082dfde2af4f7e73e812cd54cee0039a9eadf3793efee3ae3884ce423", "Last Remnant", Community),
            TrackDescriptor::new("bc7d29657a0eb2d0abb3b3639edcf4ade61705132c7ca1b56719a7a110096afd", "Malformations", Community),
            TrackDescriptor::new("faed71cf26ba4d183795ecc93e3d1b39e191e51d664272b512692b0f4f323ff5", "Sandline Ultimatum", Community),
        ]
    };
}

/// The ordered list of tracks on which players are looked up.
///
/// The order is the default display order, and decides ties when
/// picking best or worst records.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRegistry {
    tracks: Vec<TrackDescriptor>,
}

impl TrackRegistry {
    pub fn new(tracks: Vec<TrackDescriptor>) -> Self {
        TrackRegistry { tracks }
    }

    /// The built-in tracks, followed by the given extra tracks.
    /// Extra tracks that duplicate the ID of another track are skipped.
    pub fn builtin(extra: &[ExtraTrack]) -> Self {
        let mut tracks = BUILTIN_TRACKS.clone();
        for track in extra {
            if tracks.iter().any(|t| t.id == track.id) {
                log::warn!("skipping duplicate track '{}' ({})", track.name, track.id);
                continue;
            }
            tracks.push(TrackDescriptor::new(&track.id, &track.name, track.category));
        }
        TrackRegistry { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackDescriptor> {
        self.tracks.iter()
    }

    pub fn get(&self, track_id: &str) -> Option<&TrackDescriptor> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    /// The position of the track in this registry.
    pub fn index_of(&self, track_id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == track_id)
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &TrackDescriptor> {
        self.tracks.iter().filter(move |t| t.category == category)
    }
}
