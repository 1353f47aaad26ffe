//! Static species catalog.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::PondError;

/// Identifier of a catalog species, serialized as its lowercase id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeciesId {
    Qingjiang,
    Lingbo,
    Basha,
    Jinmu,
    Hailu,
}

impl SpeciesId {
    /// Every species, in catalog order.
    pub const ALL: [SpeciesId; 5] = [
        SpeciesId::Qingjiang,
        SpeciesId::Lingbo,
        SpeciesId::Basha,
        SpeciesId::Jinmu,
        SpeciesId::Hailu,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SpeciesId::Qingjiang => "qingjiang",
            SpeciesId::Lingbo => "lingbo",
            SpeciesId::Basha => "basha",
            SpeciesId::Jinmu => "jinmu",
            SpeciesId::Hailu => "hailu",
        }
    }

    /// Catalog entry for this id.
    pub fn species(self) -> &'static Species {
        &CATALOG[self as usize]
    }
}

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpeciesId {
    type Err = PondError;

    /// Case-insensitive lookup, so `"QINGJIANG"` and `"qingjiang"` agree.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SpeciesId::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| PondError::NotFound(format!("species {s}")))
    }
}

/// Immutable species definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Species {
    pub id: SpeciesId,
    /// Display name copied onto each fish.
    pub name: &'static str,
    /// Presentation icon, passed through to the UI.
    pub icon: &'static str,
    /// Presentation color (CSS hex), passed through to the UI.
    pub color: &'static str,
    /// Weight in grams at which a released fish counts as adult.
    pub target_weight_g: f64,
    /// Spread around the target weight in grams.
    pub weight_variance_g: f64,
    /// Feed units the species needs to mature.
    pub food_required: u32,
    /// Coupon value in whole currency units.
    pub value_units: u32,
}

impl Species {
    /// Coupon value minted when a fish of this species is harvested.
    pub fn value(&self) -> Decimal {
        Decimal::from(self.value_units)
    }
}

/// Species table, indexed by `SpeciesId as usize`.
pub static CATALOG: [Species; 5] = [
    Species {
        id: SpeciesId::Qingjiang,
        name: "Qingjiang",
        icon: "🐟",
        color: "#22d3ee",
        target_weight_g: 900.0,
        weight_variance_g: 200.0,
        food_required: 30,
        value_units: 50,
    },
    Species {
        id: SpeciesId::Lingbo,
        name: "Lingbo",
        icon: "🐠",
        color: "#f472b6",
        target_weight_g: 900.0,
        weight_variance_g: 200.0,
        food_required: 40,
        value_units: 80,
    },
    Species {
        id: SpeciesId::Basha,
        name: "Basha",
        icon: "🐡",
        color: "#facc15",
        target_weight_g: 900.0,
        weight_variance_g: 200.0,
        food_required: 50,
        value_units: 100,
    },
    Species {
        id: SpeciesId::Jinmu,
        name: "Golden-eye Perch",
        icon: "🎏",
        color: "#fb923c",
        target_weight_g: 900.0,
        weight_variance_g: 200.0,
        food_required: 70,
        value_units: 150,
    },
    Species {
        id: SpeciesId::Hailu,
        name: "Sea Bass",
        icon: "🐟",
        color: "#4ade80",
        target_weight_g: 950.0,
        weight_variance_g: 250.0,
        food_required: 60,
        value_units: 120,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn catalog_is_indexed_by_id() {
        for id in SpeciesId::ALL {
            assert_eq!(id.species().id, id);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("QINGJIANG".parse::<SpeciesId>().unwrap(), SpeciesId::Qingjiang);
        assert_eq!(" hailu ".parse::<SpeciesId>().unwrap(), SpeciesId::Hailu);
    }

    #[test]
    fn unknown_species_is_not_found() {
        let err = "carp".parse::<SpeciesId>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn qingjiang_is_worth_fifty() {
        assert_eq!(SpeciesId::Qingjiang.species().value(), Decimal::new(50, 0));
        assert_eq!(SpeciesId::Jinmu.species().value(), Decimal::new(150, 0));
    }

    #[test]
    fn serde_uses_lowercase_ids() {
        let s = serde_json::to_string(&SpeciesId::Lingbo).unwrap();
        assert_eq!(s, "\"lingbo\"");
        let back: SpeciesId = serde_json::from_str("\"basha\"").unwrap();
        assert_eq!(back, SpeciesId::Basha);
    }
}
