// ── Capability flags ──
//
// Decoded from the vendor's hex `featureValue` bitmask. Only the bits the
// session acts on are named; the rest are ignored.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    LockRemotely,
    UnlockViaGateway,
    PassageMode,
    Wifi,
}

impl Feature {
    /// Bit position in the `featureValue` mask.
    pub const fn bit(self) -> u32 {
        match self {
            Self::LockRemotely => 8,
            Self::UnlockViaGateway => 10,
            Self::PassageMode => 22,
            Self::Wifi => 56,
        }
    }
}

/// Set of capabilities a lock advertises.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Features(BTreeSet<Feature>);

impl Features {
    /// Decode the hex mask. Absent, empty, or non-hex input yields no
    /// features rather than an error.
    pub fn from_feature_value(value: Option<&str>) -> Self {
        let set = Feature::iter()
            .filter(|f| ttlock_api::locks::has_feature_bit(value, f.bit()))
            .collect();
        Self(set)
    }

    pub fn contains(&self, feature: Feature) -> bool {
        self.0.contains(&feature)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Feature> for Features {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&names.join(","))
    }
}
