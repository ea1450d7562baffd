use serde::{Serialize, Serializer};

/// Medals awarded for a low percentile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PercentileMedal {
    Diamond,
    Emerald,
    Gold,
    Silver,
    Bronze,
}

impl PercentileMedal {
    pub const ALL: [PercentileMedal; 5] = [
        PercentileMedal::Diamond,
        PercentileMedal::Emerald,
        PercentileMedal::Gold,
        PercentileMedal::Silver,
        PercentileMedal::Bronze,
    ];

    /// The medal for a percentile, or `None` if it is worse than 25%.
    pub fn classify(percentile: f64) -> Option<Self> {
        use PercentileMedal::*;
        match percentile {
            p if p.is_nan() => None,
            p if p <= 0.005 => Some(Diamond),
            p if p <= 0.5 => Some(Emerald),
            p if p <= 5.0 => Some(Gold),
            p if p <= 15.0 => Some(Silver),
            p if p <= 25.0 => Some(Bronze),
            _ => None,
        }
    }
}

/// Medals awarded for a leaderboard position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RankMedal {
    WorldRecord,
    Podium,
    Top10,
    Top25,
    Top50,
    Participant,
}

impl RankMedal {
    pub const ALL: [RankMedal; 6] = [
        RankMedal::WorldRecord,
        RankMedal::Podium,
        RankMedal::Top10,
        RankMedal::Top25,
        RankMedal::Top50,
        RankMedal::Participant,
    ];

    /// The medal for a 1-based rank. Every rank gets one.
    pub fn classify(rank: u32) -> Option<Self> {
        use RankMedal::*;
        match rank {
            0 => None,
            1 => Some(WorldRecord),
            2..=5 => Some(Podium),
            6..=10 => Some(Top10),
            11..=25 => Some(Top25),
            26..=50 => Some(Top50),
            _ => Some(Participant),
        }
    }
}

/// Medals awarded for being close to the world record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GapMedal {
    Perfect,
    Legendary,
    Mythic,
    Epic,
    Great,
    Good,
    Decent,
}

impl GapMedal {
    pub const ALL: [GapMedal; 7] = [
        GapMedal::Perfect,
        GapMedal::Legendary,
        GapMedal::Mythic,
        GapMedal::Epic,
        GapMedal::Great,
        GapMedal::Good,
        GapMedal::Decent,
    ];

    /// The medal for a gap in percent, or `None` if it is 30% or more.
    ///
    /// Negative gaps, which can occur for unverified records that beat
    /// the verified world record, get no medal.
    pub fn classify(percent_gap: f64) -> Option<Self> {
        use GapMedal::*;
        match percent_gap {
            g if g.is_nan() || g < 0.0 => None,
            g if g == 0.0 => Some(Perfect),
            g if g < 0.1 => Some(Legendary),
            g if g < 0.5 => Some(Mythic),
            g if g < 2.0 => Some(Epic),
            g if g < 7.0 => Some(Great),
            g if g < 15.0 => Some(Good),
            g if g < 30.0 => Some(Decent),
            _ => None,
        }
    }
}

/// The statistic a medal is awarded for.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MedalAxis {
    Percentile,
    Rank,
    WrPercentGap,
}

/// A medal of any axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Medal {
    Percentile(PercentileMedal),
    Rank(RankMedal),
    Gap(GapMedal),
}

impl Medal {
    /// Every medal, axis by axis, from best to worst.
    pub fn all() -> impl Iterator<Item = Medal> {
        PercentileMedal::ALL
            .iter()
            .map(|m| Medal::Percentile(*m))
            .chain(RankMedal::ALL.iter().map(|m| Medal::Rank(*m)))
            .chain(GapMedal::ALL.iter().map(|m| Medal::Gap(*m)))
    }

    pub fn axis(&self) -> MedalAxis {
        match self {
            Medal::Percentile(_) => MedalAxis::Percentile,
            Medal::Rank(_) => MedalAxis::Rank,
            Medal::Gap(_) => MedalAxis::WrPercentGap,
        }
    }

    /// The unique display name of this medal.
    pub fn label(&self) -> &'static str {
        use GapMedal::*;
        use PercentileMedal::*;
        use RankMedal::*;
        match self {
            Medal::Percentile(Diamond) => "Diamond",
            Medal::Percentile(Emerald) => "Emerald",
            Medal::Percentile(Gold) => "Gold",
            Medal::Percentile(Silver) => "Silver",
            Medal::Percentile(Bronze) => "Bronze",
            Medal::Rank(WorldRecord) => "WR",
            Medal::Rank(Podium) => "Podium",
            Medal::Rank(Top10) => "Top 10",
            Medal::Rank(Top25) => "Top 25",
            Medal::Rank(Top50) => "Top 50",
            Medal::Rank(Participant) => "Participant",
            Medal::Gap(Perfect) => "Perfect",
            Medal::Gap(Legendary) => "Legendary",
            Medal::Gap(Mythic) => "Mythic",
            Medal::Gap(Epic) => "Epic",
            Medal::Gap(Great) => "Great",
            Medal::Gap(Good) => "Good",
            Medal::Gap(Decent) => "Decent",
        }
    }

    pub fn icon(&self) -> char {
        match self {
            Medal::Percentile(_) => '♦',
            Medal::Rank(_) => '✦',
            Medal::Gap(_) => '★',
        }
    }

    /// The display color as `#rrggbb`.
    pub fn color(&self) -> &'static str {
        use GapMedal::*;
        use PercentileMedal::*;
        use RankMedal::*;
        match self {
            Medal::Percentile(Diamond) => "#67E8F9",
            Medal::Percentile(Emerald) => "#22C55E",
            Medal::Percentile(Gold) => "#FACC15",
            Medal::Percentile(Silver) => "#9CA3AF",
            Medal::Percentile(Bronze) => "#CD7F32",
            Medal::Rank(WorldRecord) => "#000000",
            Medal::Rank(Podium) => "#5A32A3",
            Medal::Rank(Top10) => "#9370DB",
            Medal::Rank(Top25) => "#4169E1",
            Medal::Rank(Top50) => "#87CEEB",
            Medal::Rank(Participant) => "#A0A0A0",
            Medal::Gap(Perfect) => "#FFD700",
            Medal::Gap(Legendary) => "#9400D3",
            Medal::Gap(Mythic) => "#800080",
            Medal::Gap(Epic) => "#FF1493",
            Medal::Gap(Great) => "#00BFFF",
            Medal::Gap(Good) => "#32CD32",
            Medal::Gap(Decent) => "#FFA500",
        }
    }

    pub fn from_label(label: &str) -> Option<Medal> {
        Medal::all().find(|m| m.label() == label)
    }
}

impl Serialize for Medal {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(self.label())
    }
}

impl From<PercentileMedal> for Medal {
    fn from(m: PercentileMedal) -> Self {
        Medal::Percentile(m)
    }
}

impl From<RankMedal> for Medal {
    fn from(m: RankMedal) -> Self {
        Medal::Rank(m)
    }
}

impl From<GapMedal> for Medal {
    fn from(m: GapMedal) -> Self {
        Medal::Gap(m)
    }
}
