//! Completion triggers: task completion, sustainability actions and bonuses.
//!
//! Each trigger runs the same chain as explicit calls:
//!
//! 1. award transaction ([`crate::award::apply`]) under `BEGIN IMMEDIATE`,
//!    together with the event's own state transition
//! 2. badge awarder ([`crate::badges::award_badges`]) after commit
//! 3. notifier ([`crate::notify::notify_badges`]), best-effort
//!
//! Recording an action or bonus happens inside the same transaction as its
//! award, so a failed award leaves no trace and the call can simply be
//! repeated.
//!
//! Once the award has committed, no trigger returns an error. A failing
//! badge awarder is logged and reported through
//! [`PipelineOutcome::badges_deferred`]; the awarder also runs when the event
//! turns out to be already processed, and [`Pipeline::process_pending`]
//! re-runs it for every user holding fewer badges than their total earns.

use crate::award::{self, AwardOutcome, AwardRequest};
use crate::badges;
use crate::config::{HubConfig, PointsConfig};
use crate::db::{now_us, query};
use crate::error::PipelineError;
use crate::model::{
    Badge, Bonus, EventKey, PointSource, SustainabilityAction, Task, TaskCategory, User,
};
use crate::notify::{self, StoreSink};
use crate::rates::{RateTable, normalize_action_type};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde::Serialize;
use tracing::{info, warn};

/// What one trigger did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOutcome {
    pub user_id: String,
    /// `<source>:<reference id>` of the event.
    pub event: String,
    pub points: u32,
    pub total: u64,
    pub already_processed: bool,
    pub newly_granted: Vec<Badge>,
    pub notified: usize,
    /// The award committed but granting badges failed; a later trigger or
    /// sweep grants them.
    pub badges_deferred: bool,
}

/// One event the sweep could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    pub event: String,
    pub error: String,
    pub retryable: bool,
}

/// Summary of [`Pipeline::process_pending`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub processed: usize,
    pub skipped: usize,
    pub badges_granted: usize,
    pub failures: Vec<SweepFailure>,
}

/// The award pipeline, configured once and passed to callers.
#[derive(Debug, Clone)]
pub struct Pipeline {
    task_reward: u32,
    rates: RateTable,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(&PointsConfig::default())
    }
}

impl Pipeline {
    #[must_use]
    pub fn new(points: &PointsConfig) -> Self {
        Self {
            task_reward: points.task_reward,
            rates: points.rate_table(),
        }
    }

    #[must_use]
    pub fn from_config(config: &HubConfig) -> Self {
        Self::new(&config.points)
    }

    #[must_use]
    pub const fn rates(&self) -> &RateTable {
        &self.rates
    }

    #[must_use]
    pub const fn task_reward(&self) -> u32 {
        self.task_reward
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a user and create their zero points total in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyField`] for blank input,
    /// [`PipelineError::DuplicateUser`] if the username or email is taken, or
    /// [`PipelineError::Storage`].
    pub fn register_user(
        &self,
        conn: &mut Connection,
        username: &str,
        email: &str,
    ) -> Result<User, PipelineError> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() {
            return Err(PipelineError::EmptyField("username"));
        }
        if email.is_empty() {
            return Err(PipelineError::EmptyField("email"));
        }

        let user = User {
            user_id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            created_at_us: now_us(),
        };

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO users (user_id, username, email, created_at_us) VALUES (?1, ?2, ?3, ?4)",
            params![user.user_id, user.username, user.email, user.created_at_us],
        )
        .map_err(|err| {
            if is_constraint_violation(&err) {
                PipelineError::DuplicateUser(username.to_string())
            } else {
                PipelineError::Storage(err)
            }
        })?;
        tx.execute(
            "INSERT INTO user_points (user_id, total_points, last_updated_us)
             VALUES (?1, 0, ?2)
             ON CONFLICT(user_id) DO NOTHING",
            params![user.user_id, user.created_at_us],
        )?;
        tx.commit()?;

        info!(user_id = %user.user_id, username = %user.username, "user registered");
        Ok(user)
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    /// Create an open task worth the configured task reward.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UserNotFound`], [`PipelineError::EmptyField`]
    /// for a blank title, or [`PipelineError::Storage`].
    pub fn create_task(
        &self,
        conn: &Connection,
        user_id: &str,
        title: &str,
        category: TaskCategory,
        due_date: NaiveDate,
    ) -> Result<Task, PipelineError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PipelineError::EmptyField("title"));
        }
        ensure_user(conn, user_id)?;

        let task = Task {
            task_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            category,
            due_date: due_date.format("%Y-%m-%d").to_string(),
            points_reward: self.task_reward,
            is_completed: false,
            points_processed: false,
            created_at_us: now_us(),
        };

        conn.execute(
            "INSERT INTO tasks (task_id, user_id, title, category, due_date, points_reward,
                                is_completed, points_processed, created_at_us)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, ?7)",
            params![
                task.task_id,
                task.user_id,
                task.title,
                task.category.as_str(),
                task.due_date,
                i64::from(task.points_reward),
                task.created_at_us
            ],
        )?;
        Ok(task)
    }

    /// Mark a task completed and award its reward exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TaskNotFound`] or [`PipelineError::Storage`].
    pub fn complete_task(
        &self,
        conn: &mut Connection,
        task_id: &str,
    ) -> Result<PipelineOutcome, PipelineError> {
        self.process_event(conn, EventKey::Task(task_id.to_string()))
    }

    // -----------------------------------------------------------------------
    // Sustainability actions
    // -----------------------------------------------------------------------

    /// Record a sustainability action and award its points.
    ///
    /// The action row and its award commit together; on error nothing is
    /// recorded.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidActionValue`],
    /// [`PipelineError::EmptyField`], [`PipelineError::UserNotFound`] or
    /// [`PipelineError::Storage`].
    pub fn log_action(
        &self,
        conn: &mut Connection,
        user_id: &str,
        action_type: &str,
        value: f64,
    ) -> Result<(SustainabilityAction, PipelineOutcome), PipelineError> {
        let action_type = normalize_action_type(action_type);
        if action_type.is_empty() {
            return Err(PipelineError::EmptyField("action_type"));
        }
        let points = self.rates.points_for(&action_type, value)?;

        let action = SustainabilityAction {
            action_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            action_type,
            value,
            points_earned: points,
            points_processed: false,
            created_at_us: now_us(),
        };
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_user(&tx, user_id)?;
        tx.execute(
            "INSERT INTO sustainability_actions
                 (action_id, user_id, action_type, value, points_earned, points_processed, created_at_us)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![
                action.action_id,
                action.user_id,
                action.action_type,
                action.value,
                i64::from(action.points_earned),
                action.created_at_us
            ],
        )?;

        let (request, award) = award_event(&tx, EventKey::Action(action.action_id.clone()))?;
        tx.commit()?;

        let outcome = finish(conn, request, award);
        Ok((
            SustainabilityAction {
                points_processed: true,
                ..action
            },
            outcome,
        ))
    }

    /// Award the points of an already recorded action.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ActionNotFound`] or [`PipelineError::Storage`].
    pub fn process_action(
        &self,
        conn: &mut Connection,
        action_id: &str,
    ) -> Result<PipelineOutcome, PipelineError> {
        self.process_event(conn, EventKey::Action(action_id.to_string()))
    }

    // -----------------------------------------------------------------------
    // Bonuses
    // -----------------------------------------------------------------------

    /// Record an operator bonus and award it in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UserNotFound`] or [`PipelineError::Storage`].
    pub fn grant_bonus(
        &self,
        conn: &mut Connection,
        user_id: &str,
        amount: u32,
        reason: &str,
    ) -> Result<(Bonus, PipelineOutcome), PipelineError> {
        let bonus = Bonus {
            bonus_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            amount,
            reason: reason.trim().to_string(),
            points_processed: false,
            created_at_us: now_us(),
        };
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_user(&tx, user_id)?;
        tx.execute(
            "INSERT INTO bonuses (bonus_id, user_id, amount, reason, points_processed, created_at_us)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![
                bonus.bonus_id,
                bonus.user_id,
                i64::from(bonus.amount),
                bonus.reason,
                bonus.created_at_us
            ],
        )?;

        let (request, award) = award_event(&tx, EventKey::Bonus(bonus.bonus_id.clone()))?;
        tx.commit()?;

        let outcome = finish(conn, request, award);
        Ok((
            Bonus {
                points_processed: true,
                ..bonus
            },
            outcome,
        ))
    }

    // -----------------------------------------------------------------------
    // Sweep
    // -----------------------------------------------------------------------

    /// Process every completed task, action and bonus whose points were never
    /// awarded, then grant badges to users whose earlier grant was deferred.
    /// A failing event or user is recorded in the report and the sweep moves
    /// on to the next one.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Storage`] only if the pending set cannot be
    /// read.
    pub fn process_pending(&self, conn: &mut Connection) -> Result<SweepReport, PipelineError> {
        let pending = pending_events(conn)?;
        let mut report = SweepReport::default();

        for event in pending {
            let label = event.to_string();
            match self.process_event(conn, event) {
                Ok(outcome) if outcome.already_processed => report.skipped += 1,
                Ok(outcome) => {
                    report.processed += 1;
                    report.badges_granted += outcome.newly_granted.len();
                }
                Err(error) => {
                    warn!(event = %label, error = %error, "pending event failed");
                    report.failures.push(SweepFailure {
                        event: label,
                        error: error.to_string(),
                        retryable: error.is_retryable(),
                    });
                }
            }
        }

        for user_id in users_missing_badges(conn)? {
            match badges::award_badges(conn, &user_id) {
                Ok(granted) => {
                    notify::notify_badges(&StoreSink::new(conn), &user_id, &granted);
                    report.badges_granted += granted.len();
                }
                Err(error) => {
                    warn!(user_id = %user_id, error = %error, "deferred badge grant failed");
                    report.failures.push(SweepFailure {
                        event: format!("badges:{user_id}"),
                        error: error.to_string(),
                        retryable: error.is_retryable(),
                    });
                }
            }
        }

        info!(
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failures.len(),
            "pending sweep finished"
        );
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Internal chain
    // -----------------------------------------------------------------------

    #[allow(clippy::unused_self)]
    fn process_event(
        &self,
        conn: &mut Connection,
        event: EventKey,
    ) -> Result<PipelineOutcome, PipelineError> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let (request, award) = award_event(&tx, event)?;
        tx.commit()?;

        Ok(finish(conn, request, award))
    }
}

/// Load an event and run the award transaction on `tx`. Tasks are marked
/// completed in the same transaction.
fn award_event(
    tx: &Connection,
    event: EventKey,
) -> Result<(AwardRequest, AwardOutcome), PipelineError> {
    let (user_id, points) = load_event(tx, &event)?;

    if let EventKey::Task(task_id) = &event {
        tx.execute(
            "UPDATE tasks SET is_completed = 1 WHERE task_id = ?1 AND is_completed = 0",
            [task_id],
        )?;
    }

    let request = AwardRequest {
        user_id,
        points,
        event,
    };
    let award = award::apply(tx, &request)?;
    Ok((request, award))
}

/// Badge awarder and notifier, run after the award transaction committed.
/// Never fails: the points are already recorded.
fn finish(conn: &Connection, request: AwardRequest, award: AwardOutcome) -> PipelineOutcome {
    let (newly_granted, badges_deferred) = match badges::award_badges(conn, &request.user_id) {
        Ok(granted) => (granted, false),
        Err(error) => {
            warn!(
                event = %request.event,
                user_id = %request.user_id,
                error = %error,
                "badge grant deferred"
            );
            (Vec::new(), true)
        }
    };
    let notified = notify::notify_badges(&StoreSink::new(conn), &request.user_id, &newly_granted);

    PipelineOutcome {
        event: request.event.to_string(),
        points: request.points,
        total: award.total(),
        already_processed: award.is_already_processed(),
        newly_granted,
        notified,
        badges_deferred,
        user_id: request.user_id,
    }
}

fn ensure_user(conn: &Connection, user_id: &str) -> Result<(), PipelineError> {
    if query::user_exists(conn, user_id)? {
        Ok(())
    } else {
        Err(PipelineError::UserNotFound(user_id.to_string()))
    }
}

/// Owner and point value of an event.
fn load_event(conn: &Connection, event: &EventKey) -> Result<(String, u32), PipelineError> {
    let sql = match event {
        EventKey::Task(_) => "SELECT user_id, points_reward FROM tasks WHERE task_id = ?1",
        EventKey::Action(_) => {
            "SELECT user_id, points_earned FROM sustainability_actions WHERE action_id = ?1"
        }
        EventKey::Bonus(_) => "SELECT user_id, amount FROM bonuses WHERE bonus_id = ?1",
    };

    conn.query_row(sql, [event.reference_id()], |row| {
        Ok((row.get::<_, String>(0)?, query::column_u32(row, 1)?))
    })
    .optional()?
    .ok_or_else(|| award::event_not_found(event))
}

fn pending_events(conn: &Connection) -> rusqlite::Result<Vec<EventKey>> {
    let mut stmt = conn.prepare(
        "SELECT 'task', task_id, created_at_us FROM tasks
             WHERE is_completed = 1 AND points_processed = 0
         UNION ALL
         SELECT 'sustainability_action', action_id, created_at_us FROM sustainability_actions
             WHERE points_processed = 0
         UNION ALL
         SELECT 'bonus', bonus_id, created_at_us FROM bonuses
             WHERE points_processed = 0
         ORDER BY 3 ASC, 2 ASC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let source = query::column_parsed::<PointSource>(row, 0)?;
            Ok(EventKey::from_source(source, row.get(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Users with ledger activity whose total meets a badge they do not hold.
fn users_missing_badges(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT p.user_id
         FROM user_points p
         JOIN badges b ON b.points_required <= p.total_points
         LEFT JOIN user_badges g ON g.user_id = p.user_id AND g.badge_id = b.badge_id
         WHERE g.badge_id IS NULL
           AND EXISTS (SELECT 1 FROM points_ledger l WHERE l.user_id = p.user_id)
         ORDER BY p.user_id",
    )?;
    let rows = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::Pipeline;
    use crate::badges::sync_catalog;
    use crate::db::{open_in_memory, query};
    use crate::error::PipelineError;
    use crate::model::{BadgeDef, PointSource, TaskCategory};
    use chrono::NaiveDate;
    use rusqlite::Connection;

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, 1).expect("valid date")
    }

    fn hub(catalog: &[(&str, u64)]) -> (Connection, Pipeline, String) {
        let mut conn = open_in_memory().expect("open db");
        let defs: Vec<BadgeDef> = catalog
            .iter()
            .map(|(name, points)| BadgeDef::new(name, "", *points))
            .collect();
        sync_catalog(&mut conn, &defs).expect("sync catalog");
        let pipeline = Pipeline::default();
        let user = pipeline
            .register_user(&mut conn, "fern", "fern@example.com")
            .expect("register");
        (conn, pipeline, user.user_id)
    }

    #[test]
    fn registration_creates_zero_total() {
        let (conn, _pipeline, user_id) = hub(&[]);
        let total = query::points_total(&conn, &user_id).expect("query").expect("row");
        assert_eq!(total.total_points, 0);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let (mut conn, pipeline, _user_id) = hub(&[]);
        let err = pipeline
            .register_user(&mut conn, "fern", "other@example.com")
            .expect_err("duplicate username");
        assert!(matches!(err, PipelineError::DuplicateUser(_)));
        assert!(matches!(
            pipeline.register_user(&mut conn, " ", "x@example.com"),
            Err(PipelineError::EmptyField("username"))
        ));
        assert_eq!(query::list_users(&conn).expect("users").len(), 1);
    }

    #[test]
    fn completing_a_task_awards_reward_once() {
        let (mut conn, pipeline, user_id) = hub(&[("Ten", 10)]);
        let task = pipeline
            .create_task(&conn, &user_id, "Plant a tree", TaskCategory::Sustainability, due())
            .expect("create task");

        let first = pipeline.complete_task(&mut conn, &task.task_id).expect("complete");
        assert_eq!(first.points, 10);
        assert_eq!(first.total, 10);
        assert!(!first.already_processed);
        assert_eq!(first.newly_granted.len(), 1);
        assert_eq!(first.notified, 1);

        let second = pipeline.complete_task(&mut conn, &task.task_id).expect("complete again");
        assert!(second.already_processed);
        assert_eq!(second.total, 10);
        assert!(second.newly_granted.is_empty());
        assert_eq!(second.notified, 0);

        let stored = query::get_task(&conn, &task.task_id).expect("query").expect("task");
        assert!(stored.is_completed);
        assert!(stored.points_processed);
        assert_eq!(query::ledger_for_user(&conn, &user_id).expect("ledger").len(), 1);
        assert_eq!(
            query::list_notifications(&conn, &user_id, false).expect("notes").len(),
            1
        );
    }

    #[test]
    fn blank_task_title_is_rejected() {
        let (conn, pipeline, user_id) = hub(&[]);
        assert!(matches!(
            pipeline.create_task(&conn, &user_id, "  ", TaskCategory::Exercise, due()),
            Err(PipelineError::EmptyField("title"))
        ));
        assert!(matches!(
            pipeline.create_task(&conn, "ghost", "Run", TaskCategory::Exercise, due()),
            Err(PipelineError::UserNotFound(_))
        ));
    }

    #[test]
    fn missing_task_is_reported() {
        let (mut conn, pipeline, _user_id) = hub(&[]);
        assert!(matches!(
            pipeline.complete_task(&mut conn, "t-missing"),
            Err(PipelineError::TaskNotFound(_))
        ));
    }

    #[test]
    fn logged_actions_use_the_rate_table() {
        let (mut conn, pipeline, user_id) = hub(&[]);
        let (action, outcome) = pipeline
            .log_action(&mut conn, &user_id, "Recycle", 3.0)
            .expect("log recycle");
        assert_eq!(action.action_type, "recycle");
        assert_eq!(action.points_earned, 30);
        assert!(action.points_processed);
        assert_eq!(outcome.total, 30);

        let (_, unknown) = pipeline
            .log_action(&mut conn, &user_id, "unknown", 4.0)
            .expect("log unknown");
        assert_eq!(unknown.points, 4);
        assert_eq!(unknown.total, 34);

        let ledger = query::ledger_for_user(&conn, &user_id).expect("ledger");
        assert!(ledger.iter().all(|e| e.source == PointSource::SustainabilityAction));
    }

    #[test]
    fn invalid_action_value_records_nothing() {
        let (mut conn, pipeline, user_id) = hub(&[]);
        assert!(matches!(
            pipeline.log_action(&mut conn, &user_id, "bike", -2.0),
            Err(PipelineError::InvalidActionValue { .. })
        ));
        assert!(query::list_actions(&conn, &user_id).expect("actions").is_empty());
    }

    #[test]
    fn bonus_is_recorded_with_bonus_source() {
        let (mut conn, pipeline, user_id) = hub(&[]);
        let (bonus, outcome) = pipeline
            .grant_bonus(&mut conn, &user_id, 25, "Community cleanup")
            .expect("bonus");
        assert_eq!(outcome.total, 25);
        let ledger = query::ledger_for_user(&conn, &user_id).expect("ledger");
        assert_eq!(ledger[0].source, PointSource::Bonus);
        assert_eq!(ledger[0].reference_id, bonus.bonus_id);
        let stored = query::get_bonus(&conn, &bonus.bonus_id).expect("query").expect("row");
        assert!(stored.points_processed);
    }

    #[test]
    fn failed_award_records_nothing_and_can_be_repeated() {
        let (mut conn, pipeline, user_id) = hub(&[]);
        conn.execute_batch(
            "CREATE TRIGGER fail_ledger BEFORE INSERT ON points_ledger
             BEGIN SELECT RAISE(ABORT, 'simulated storage failure'); END;",
        )
        .expect("install trigger");

        let err = pipeline
            .log_action(&mut conn, &user_id, "recycle", 1.0)
            .expect_err("award fails");
        assert!(err.is_retryable());
        let err = pipeline
            .grant_bonus(&mut conn, &user_id, 5, "welcome")
            .expect_err("award fails");
        assert!(err.is_retryable());

        assert!(query::list_actions(&conn, &user_id).expect("actions").is_empty());
        assert_eq!(query::current_total(&conn, &user_id).expect("total"), 0);

        conn.execute_batch("DROP TRIGGER fail_ledger;").expect("drop trigger");
        let (_, outcome) = pipeline
            .log_action(&mut conn, &user_id, "recycle", 1.0)
            .expect("repeat log");
        assert_eq!(outcome.total, 10);
        let (_, outcome) = pipeline
            .grant_bonus(&mut conn, &user_id, 5, "welcome")
            .expect("repeat bonus");
        assert_eq!(outcome.total, 15);

        let report = pipeline.process_pending(&mut conn).expect("sweep");
        assert_eq!(report.processed, 0);
        assert_eq!(query::current_total(&conn, &user_id).expect("total"), 15);
        assert_eq!(query::list_actions(&conn, &user_id).expect("actions").len(), 1);
        assert_eq!(query::ledger_for_user(&conn, &user_id).expect("ledger").len(), 2);
    }

    #[test]
    fn recorded_action_can_be_processed_later() {
        let (mut conn, pipeline, user_id) = hub(&[]);
        conn.execute_batch(&format!(
            "INSERT INTO sustainability_actions VALUES ('a-late', '{user_id}', 'bike', 2.0, 10, 0, 1);"
        ))
        .expect("seed action");

        let outcome = pipeline.process_action(&mut conn, "a-late").expect("process");
        assert_eq!(outcome.total, 10);
        assert!(!outcome.already_processed);

        let again = pipeline.process_action(&mut conn, "a-late").expect("replay");
        assert!(again.already_processed);
        assert_eq!(again.total, 10);
    }

    #[test]
    fn badge_failure_after_award_is_deferred_not_returned() {
        let (mut conn, pipeline, user_id) = hub(&[("Ten", 10)]);
        conn.execute_batch(
            "CREATE TRIGGER fail_grant BEFORE INSERT ON user_badges
             BEGIN SELECT RAISE(ABORT, 'simulated storage failure'); END;",
        )
        .expect("install trigger");

        let (_, outcome) = pipeline
            .grant_bonus(&mut conn, &user_id, 10, "cleanup")
            .expect("award commits despite badge failure");
        assert_eq!(outcome.total, 10);
        assert!(outcome.badges_deferred);
        assert!(outcome.newly_granted.is_empty());
        assert_eq!(query::ledger_for_user(&conn, &user_id).expect("ledger").len(), 1);

        conn.execute_batch("DROP TRIGGER fail_grant;").expect("drop trigger");
        let report = pipeline.process_pending(&mut conn).expect("sweep");
        assert_eq!(report.processed, 0);
        assert_eq!(report.badges_granted, 1);
        assert!(report.failures.is_empty());

        assert_eq!(query::current_total(&conn, &user_id).expect("total"), 10);
        assert_eq!(query::ledger_for_user(&conn, &user_id).expect("ledger").len(), 1);
        assert_eq!(query::user_badges(&conn, &user_id).expect("grants").len(), 1);
        assert_eq!(
            query::list_notifications(&conn, &user_id, false).expect("notes").len(),
            1
        );

        let again = pipeline.process_pending(&mut conn).expect("second sweep");
        assert_eq!(again.badges_granted, 0);
    }

    #[test]
    fn sweep_leaves_users_without_awards_alone() {
        let (mut conn, pipeline, user_id) = hub(&[("Zero", 0)]);
        let report = pipeline.process_pending(&mut conn).expect("sweep");
        assert_eq!(report.badges_granted, 0);
        assert!(query::user_badges(&conn, &user_id).expect("grants").is_empty());
    }

    #[test]
    fn unknown_pending_kind_is_a_conversion_error() {
        let conn = open_in_memory().expect("open db");
        let mut stmt = conn
            .prepare("SELECT 'refund', 'r-1'")
            .expect("prepare");
        let err = stmt
            .query_row([], |row| query::column_parsed::<PointSource>(row, 0))
            .expect_err("unknown kind");
        assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(0, _, _)));
    }

    #[test]
    fn sweep_processes_pending_and_reports_failures() {
        let (mut conn, pipeline, user_id) = hub(&[]);
        conn.execute_batch(&format!(
            "INSERT INTO tasks VALUES ('t-done', '{user_id}', 'Swim', 'exercise', '2026-01-01', 7, 1, 0, 1);
             INSERT INTO tasks VALUES ('t-open', '{user_id}', 'Row', 'exercise', '2026-01-01', 7, 0, 0, 2);
             INSERT INTO sustainability_actions VALUES ('a-1', '{user_id}', 'bike', 1.0, 5, 0, 3);
             INSERT INTO bonuses VALUES ('b-1', '{user_id}', 3, 'welcome', 0, 4);"
        ))
        .expect("seed pending");

        let report = pipeline.process_pending(&mut conn).expect("sweep");
        assert_eq!(report.processed, 3);
        assert!(report.failures.is_empty());
        assert_eq!(query::current_total(&conn, &user_id).expect("total"), 15);

        let open = query::get_task(&conn, "t-open").expect("query").expect("task");
        assert!(!open.points_processed);

        let again = pipeline.process_pending(&mut conn).expect("second sweep");
        assert_eq!(again.processed, 0);
    }
}
