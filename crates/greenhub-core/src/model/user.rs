use serde::Serialize;

/// A registered hub member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub created_at_us: i64,
}
