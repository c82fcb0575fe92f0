use serde::Serialize;

/// A queued, user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub notification_id: i64,
    pub user_id: String,
    pub message: String,
    pub badge_id: Option<String>,
    pub is_read: bool,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}
