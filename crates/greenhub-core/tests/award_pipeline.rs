//! End-to-end checks of the award chain through the public API:
//! award transaction, badge awarder and notifier.

use chrono::NaiveDate;
use greenhub_core::badges::sync_catalog;
use greenhub_core::db::{self, query};
use greenhub_core::model::{BadgeDef, TaskCategory, User};
use greenhub_core::pipeline::Pipeline;
use rusqlite::Connection;

fn hub_with_catalog(catalog: &[BadgeDef]) -> (Connection, Pipeline, User) {
    let mut conn = db::open_in_memory().expect("open db");
    sync_catalog(&mut conn, catalog).expect("sync catalog");
    let pipeline = Pipeline::default();
    let user = pipeline
        .register_user(&mut conn, "rowan", "rowan@example.com")
        .expect("register user");
    (conn, pipeline, user)
}

fn due() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 12, 24).expect("valid date")
}

#[test]
fn thresholds_are_granted_once_total_crosses_them() {
    let (mut conn, pipeline, user) = hub_with_catalog(&[
        BadgeDef::new("Zero", "", 0),
        BadgeDef::new("Fifty", "", 50),
        BadgeDef::new("Hundred", "", 100),
    ]);

    let (_, first) = pipeline
        .grant_bonus(&mut conn, &user.user_id, 40, "first")
        .expect("first event");
    assert_eq!(first.total, 40);
    let first_names: Vec<_> = first.newly_granted.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(first_names, ["Zero"]);

    let (_, second) = pipeline
        .grant_bonus(&mut conn, &user.user_id, 35, "second")
        .expect("second event");
    assert_eq!(second.total, 75);
    let second_names: Vec<_> = second.newly_granted.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(second_names, ["Fifty"]);

    let mut held: Vec<_> = query::user_badges(&conn, &user.user_id)
        .expect("grants")
        .into_iter()
        .map(|g| g.badge.name)
        .collect();
    held.sort();
    assert_eq!(held, ["Fifty", "Zero"]);
}

#[test]
fn duplicate_trigger_leaves_state_unchanged() {
    let (mut conn, pipeline, user) = hub_with_catalog(&[BadgeDef::new("A", "", 10)]);
    let task = pipeline
        .create_task(
            &conn,
            &user.user_id,
            "Cycle to work",
            TaskCategory::Exercise,
            due(),
        )
        .expect("create task");

    let first = pipeline
        .complete_task(&mut conn, &task.task_id)
        .expect("first trigger");
    assert_eq!(first.total, 10);
    assert_eq!(first.newly_granted.len(), 1);
    assert_eq!(first.notified, 1);

    let notes = query::list_notifications(&conn, &user.user_id, false).expect("notes");
    assert_eq!(notes.len(), 1);
    assert_eq!(
        notes[0].badge_id.as_deref(),
        Some(first.newly_granted[0].badge_id.as_str())
    );

    let second = pipeline
        .complete_task(&mut conn, &task.task_id)
        .expect("duplicate trigger");
    assert!(second.already_processed);
    assert_eq!(second.total, 10);
    assert!(second.newly_granted.is_empty());

    assert_eq!(query::ledger_for_user(&conn, &user.user_id).expect("ledger").len(), 1);
    assert_eq!(query::user_badges(&conn, &user.user_id).expect("grants").len(), 1);
    assert_eq!(
        query::list_notifications(&conn, &user.user_id, false)
            .expect("notes")
            .len(),
        1
    );
}

#[test]
fn action_points_follow_rates() {
    let (mut conn, pipeline, user) = hub_with_catalog(&[]);

    let (_, recycle) = pipeline
        .log_action(&mut conn, &user.user_id, "recycle", 3.0)
        .expect("recycle");
    assert_eq!(recycle.points, 30);

    let (_, unknown) = pipeline
        .log_action(&mut conn, &user.user_id, "unknown", 4.0)
        .expect("unknown");
    assert_eq!(unknown.points, 4);
    assert_eq!(unknown.total, 34);
}

#[test]
fn total_matches_ledger_across_sources() {
    let (mut conn, pipeline, user) = hub_with_catalog(&[]);
    let task = pipeline
        .create_task(&conn, &user.user_id, "Meal prep", TaskCategory::Nutrition, due())
        .expect("task");
    pipeline
        .complete_task(&mut conn, &task.task_id)
        .expect("complete");
    pipeline
        .log_action(&mut conn, &user.user_id, "bike", 2.5)
        .expect("bike");
    pipeline
        .grant_bonus(&mut conn, &user.user_id, 7, "streak")
        .expect("bonus");

    let total = query::current_total(&conn, &user.user_id).expect("total");
    assert_eq!(total, 10 + 12 + 7);
    assert_eq!(query::ledger_sum(&conn, &user.user_id).expect("sum"), total);
    assert_eq!(query::ledger_for_user(&conn, &user.user_id).expect("ledger").len(), 3);
}

#[test]
fn default_catalog_grants_seedling_on_first_award() {
    let (mut conn, pipeline, user) =
        hub_with_catalog(&greenhub_core::model::badge::default_catalog());

    let (_, outcome) = pipeline
        .log_action(&mut conn, &user.user_id, "public_transport", 1.0)
        .expect("log action");
    let names: Vec<_> = outcome.newly_granted.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, ["Seedling"]);
}

#[test]
fn leaderboard_ranks_by_total() {
    let (mut conn, pipeline, rowan) = hub_with_catalog(&[]);
    let moss = pipeline
        .register_user(&mut conn, "moss", "moss@example.com")
        .expect("register moss");

    pipeline
        .grant_bonus(&mut conn, &rowan.user_id, 5, "")
        .expect("bonus rowan");
    pipeline
        .grant_bonus(&mut conn, &moss.user_id, 20, "")
        .expect("bonus moss");

    let board = query::leaderboard(&conn, 10).expect("leaderboard");
    let order: Vec<_> = board.iter().map(|t| t.username.as_str()).collect();
    assert_eq!(order, ["moss", "rowan"]);
}
