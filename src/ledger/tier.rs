//! Tier classification.

use std::fmt;

use serde::Serialize;

use super::types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Tier {
    New,
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::New => "New",
            Tier::Bronze => "Bronze",
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
            Tier::Platinum => "Platinum",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds, ascending. A balance maps to the last entry it reaches.
const CUSTOMER_TIERS: &[(i64, Tier)] = &[
    (10, Tier::Bronze),
    (50, Tier::Silver),
    (100, Tier::Gold),
];

const REPRESENTATIVE_TIERS: &[(i64, Tier)] = &[
    (10, Tier::Bronze),
    (50, Tier::Silver),
    (100, Tier::Gold),
    (200, Tier::Platinum),
];

fn thresholds(role: Role) -> &'static [(i64, Tier)] {
    match role {
        Role::Customer => CUSTOMER_TIERS,
        Role::Representative => REPRESENTATIVE_TIERS,
    }
}

/// Classify a balance for the given role.
pub fn tier(balance: i64, role: Role) -> Tier {
    thresholds(role)
        .iter()
        .take_while(|(floor, _)| balance >= *floor)
        .last()
        .map(|(_, tier)| *tier)
        .unwrap_or(Tier::New)
}
