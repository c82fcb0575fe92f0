use super::{ParseEnumError, normalize};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// What earned the points recorded in a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointSource {
    Task,
    SustainabilityAction,
    Bonus,
}

impl PointSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::SustainabilityAction => "sustainability_action",
            Self::Bonus => "bonus",
        }
    }
}

impl fmt::Display for PointSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointSource {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "task" => Ok(Self::Task),
            "sustainability_action" | "sustainability" | "action" => {
                Ok(Self::SustainabilityAction)
            }
            "bonus" => Ok(Self::Bonus),
            _ => Err(ParseEnumError {
                expected: "point source",
                got: s.to_string(),
            }),
        }
    }
}

/// One immutable point award.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub entry_id: i64,
    pub user_id: String,
    pub amount: u32,
    pub source: PointSource,
    pub reference_id: String,
    pub created_at_us: i64,
}

/// A user's running total, always equal to the sum of their ledger amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointsTotal {
    pub user_id: String,
    pub username: String,
    pub total_points: u64,
    pub last_updated_us: i64,
}
