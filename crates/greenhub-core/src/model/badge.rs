use serde::{Deserialize, Serialize};

/// A catalog badge as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub badge_id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub points_required: u64,
}

/// A badge held by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeGrant {
    pub user_id: String,
    pub badge: Badge,
    pub awarded_at_us: i64,
}

/// A catalog entry as configured by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    pub points_required: u64,
}

impl BadgeDef {
    #[must_use]
    pub fn new(name: &str, description: &str, points_required: u64) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            icon: String::new(),
            points_required,
        }
    }
}

/// Catalog used when the hub config does not list any badges.
#[must_use]
pub fn default_catalog() -> Vec<BadgeDef> {
    vec![
        BadgeDef::new("Seedling", "Joined the hub and earned a first award", 0),
        BadgeDef::new("Sprout", "Earned 50 points", 50),
        BadgeDef::new("Sapling", "Earned 100 points", 100),
        BadgeDef::new("Evergreen", "Earned 500 points", 500),
    ]
}
