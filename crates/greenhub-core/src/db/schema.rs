//! Canonical SQLite schema for a greenhub store.
//!
//! - `points_ledger` is append-only; `user_points` is its running total and
//!   the two are only ever written together inside one transaction
//! - `badges` is the operator-managed catalog, `user_badges` the grants
//!   (one row per user/badge pair, enforced by the primary key)
//! - `tasks`, `sustainability_actions` and `bonuses` are the completion
//!   events; each carries its own `points_processed` idempotency flag
//! - `hub_meta` mirrors the schema version for diagnostics

/// Migration v1: users, points, badges and notifications.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE CHECK (length(trim(username)) > 0),
    email TEXT NOT NULL UNIQUE CHECK (length(trim(email)) > 0),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS user_points (
    user_id TEXT PRIMARY KEY REFERENCES users(user_id) ON DELETE CASCADE,
    total_points INTEGER NOT NULL DEFAULT 0 CHECK (total_points >= 0),
    last_updated_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS points_ledger (
    entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    amount INTEGER NOT NULL CHECK (amount >= 0),
    source TEXT NOT NULL CHECK (source IN ('task', 'sustainability_action', 'bonus')),
    reference_id TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS badges (
    badge_id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE CHECK (length(trim(name)) > 0),
    description TEXT NOT NULL DEFAULT '',
    icon TEXT NOT NULL DEFAULT '',
    points_required INTEGER NOT NULL CHECK (points_required >= 0)
);

CREATE TABLE IF NOT EXISTS user_badges (
    user_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    badge_id TEXT NOT NULL REFERENCES badges(badge_id) ON DELETE CASCADE,
    awarded_at_us INTEGER NOT NULL,
    PRIMARY KEY (user_id, badge_id)
);

CREATE TABLE IF NOT EXISTS notifications (
    notification_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    message TEXT NOT NULL,
    badge_id TEXT REFERENCES badges(badge_id) ON DELETE SET NULL,
    is_read INTEGER NOT NULL DEFAULT 0 CHECK (is_read IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS hub_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO hub_meta (id, schema_version, created_at_us)
VALUES (1, 1, 0);
";

/// Migration v2: completion events and read-path indexes.
pub const MIGRATION_V2_SQL: &str = r"
CREATE TABLE IF NOT EXISTS tasks (
    task_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    category TEXT NOT NULL CHECK (category IN ('exercise', 'nutrition', 'sustainability')),
    due_date TEXT NOT NULL,
    points_reward INTEGER NOT NULL CHECK (points_reward >= 0),
    is_completed INTEGER NOT NULL DEFAULT 0 CHECK (is_completed IN (0, 1)),
    points_processed INTEGER NOT NULL DEFAULT 0 CHECK (points_processed IN (0, 1)),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS sustainability_actions (
    action_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    action_type TEXT NOT NULL CHECK (length(trim(action_type)) > 0),
    value REAL NOT NULL CHECK (value >= 0),
    points_earned INTEGER NOT NULL CHECK (points_earned >= 0),
    points_processed INTEGER NOT NULL DEFAULT 0 CHECK (points_processed IN (0, 1)),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS bonuses (
    bonus_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    amount INTEGER NOT NULL CHECK (amount >= 0),
    reason TEXT NOT NULL DEFAULT '',
    points_processed INTEGER NOT NULL DEFAULT 0 CHECK (points_processed IN (0, 1)),
    created_at_us INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_points_ledger_user_created
    ON points_ledger(user_id, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_user_points_total
    ON user_points(total_points DESC);

CREATE INDEX IF NOT EXISTS idx_badges_threshold
    ON badges(points_required);

CREATE INDEX IF NOT EXISTS idx_notifications_user_created
    ON notifications(user_id, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_tasks_user
    ON tasks(user_id, is_completed);

CREATE INDEX IF NOT EXISTS idx_tasks_pending
    ON tasks(is_completed, points_processed);

CREATE INDEX IF NOT EXISTS idx_actions_user_created
    ON sustainability_actions(user_id, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_actions_pending
    ON sustainability_actions(points_processed);

CREATE INDEX IF NOT EXISTS idx_bonuses_pending
    ON bonuses(points_processed);

UPDATE hub_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by ledger, leaderboard and sweep query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_points_ledger_user_created",
    "idx_user_points_total",
    "idx_badges_threshold",
    "idx_notifications_user_created",
    "idx_tasks_user",
    "idx_tasks_pending",
    "idx_actions_user_created",
    "idx_actions_pending",
    "idx_bonuses_pending",
];
