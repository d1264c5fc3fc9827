//! Integration tests for wizard session persistence.
//!
//! Exercises `PgSessionStore` and `WizardSessionRepo` against a real database:
//! - Stored data reads back unchanged and a second write replaces it
//! - Deleting removes only the targeted form key
//! - `delete_older_than` purges stale rows and keeps fresh ones
//! - A row whose JSON is not a string map surfaces as an internal error

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use notify_admin_core::error::CoreError;
use notify_admin_core::types::{FormData, SessionId};
use notify_admin_core::wizard::SessionStore;
use notify_admin_db::repositories::WizardSessionRepo;
use notify_admin_db::PgSessionStore;
use sqlx::PgPool;

const FORM_KEY: &str = "add_service_form";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn form(pairs: &[(&str, &str)]) -> FormData {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Move a row's `updated_at` into the past.
async fn backdate(pool: &PgPool, session: SessionId, days: i32) {
    sqlx::query(
        "UPDATE wizard_sessions SET updated_at = NOW() - make_interval(days => $2)
         WHERE session_id = $1",
    )
    .bind(session)
    .bind(days)
    .execute(pool)
    .await
    .unwrap();
}

// ---------------------------------------------------------------------------
// Test: stored data round-trips and a second write replaces it
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn set_then_get_returns_stored_data(pool: PgPool) {
    let store = PgSessionStore::new(pool);
    let session = SessionId::new_v4();

    assert_eq!(store.get(session, FORM_KEY).await.unwrap(), None);

    let data = form(&[("default_branding", "fr"), ("name", "Aide fiscale")]);
    store.set(session, FORM_KEY, &data).await.unwrap();

    assert_eq!(store.get(session, FORM_KEY).await.unwrap(), Some(data));
    assert_eq!(store.backend(), "postgres");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn set_overwrites_existing_row(pool: PgPool) {
    let store = PgSessionStore::new(pool.clone());
    let session = SessionId::new_v4();

    store
        .set(session, FORM_KEY, &form(&[("name", "First")]))
        .await
        .unwrap();
    let first = WizardSessionRepo::find(&pool, session, FORM_KEY)
        .await
        .unwrap()
        .unwrap();

    let replacement = form(&[("name", "Second"), ("email_from", "second")]);
    store.set(session, FORM_KEY, &replacement).await.unwrap();
    let second = WizardSessionRepo::find(&pool, session, FORM_KEY)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(second.id, first.id);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(store.get(session, FORM_KEY).await.unwrap(), Some(replacement));

    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM wizard_sessions WHERE session_id = $1")
            .bind(session)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sessions_and_keys_are_isolated(pool: PgPool) {
    let store = PgSessionStore::new(pool);
    let a = SessionId::new_v4();
    let b = SessionId::new_v4();

    store.set(a, FORM_KEY, &form(&[("name", "A")])).await.unwrap();
    store.set(b, FORM_KEY, &form(&[("name", "B")])).await.unwrap();
    store.set(a, "other_form", &form(&[("x", "1")])).await.unwrap();

    assert_eq!(
        store.get(a, FORM_KEY).await.unwrap(),
        Some(form(&[("name", "A")]))
    );
    assert_eq!(
        store.get(b, FORM_KEY).await.unwrap(),
        Some(form(&[("name", "B")]))
    );
}

// ---------------------------------------------------------------------------
// Test: delete removes only the targeted row
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_removes_only_that_key(pool: PgPool) {
    let store = PgSessionStore::new(pool.clone());
    let session = SessionId::new_v4();

    store.set(session, FORM_KEY, &form(&[("name", "A")])).await.unwrap();
    store.set(session, "other_form", &form(&[("x", "1")])).await.unwrap();

    store.delete(session, FORM_KEY).await.unwrap();

    assert_eq!(store.get(session, FORM_KEY).await.unwrap(), None);
    assert!(store.get(session, "other_form").await.unwrap().is_some());

    // Deleting a missing row is not an error.
    store.delete(session, FORM_KEY).await.unwrap();
    assert!(!WizardSessionRepo::delete(&pool, session, FORM_KEY).await.unwrap());
}

// ---------------------------------------------------------------------------
// Test: delete_older_than purges only stale rows
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_older_than_purges_stale_rows(pool: PgPool) {
    let store = PgSessionStore::new(pool.clone());
    let stale = SessionId::new_v4();
    let fresh = SessionId::new_v4();

    store.set(stale, FORM_KEY, &form(&[("name", "Old")])).await.unwrap();
    store.set(fresh, FORM_KEY, &form(&[("name", "New")])).await.unwrap();
    backdate(&pool, stale, 2).await;

    let cutoff = Utc::now() - Duration::hours(24);
    let deleted = WizardSessionRepo::delete_older_than(&pool, cutoff)
        .await
        .unwrap();

    assert_eq!(deleted, 1);
    assert_eq!(store.get(stale, FORM_KEY).await.unwrap(), None);
    assert!(store.get(fresh, FORM_KEY).await.unwrap().is_some());

    let deleted = WizardSessionRepo::delete_older_than(&pool, cutoff)
        .await
        .unwrap();
    assert_eq!(deleted, 0);
}

// ---------------------------------------------------------------------------
// Test: unreadable stored JSON is an internal error
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn corrupt_row_is_internal_error(pool: PgPool) {
    let store = PgSessionStore::new(pool.clone());
    let session = SessionId::new_v4();

    for corrupt in [
        serde_json::json!({ "name": 42 }),
        serde_json::json!(["name", "value"]),
    ] {
        WizardSessionRepo::upsert(&pool, session, FORM_KEY, &corrupt)
            .await
            .unwrap();

        let result = store.get(session, FORM_KEY).await;
        assert_matches!(
            result,
            Err(CoreError::Internal(msg)) if msg.contains("Corrupt wizard session")
        );
    }
}
