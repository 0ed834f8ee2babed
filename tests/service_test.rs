use bokmerke::auth;
use bokmerke::db::Database;
use bokmerke::error::{AuthError, SyncError};
use bokmerke::model::{BookmarkItem, RegisterUser};
use bokmerke::sync;
use serde_json::{Value, json};

async fn test_db() -> Database {
    Database::open(":memory:").await.expect("in-memory db")
}

async fn seed_user(db: &Database, username: &str) -> i64 {
    let user = auth::create_user(
        db,
        RegisterUser {
            name: format!("{username} test"),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "hunter2".to_string(),
        },
    )
    .await
    .expect("seed user");
    user.id
}

fn payload(user_id: i64, items: &[(&str, &str)]) -> Value {
    let bookmarks: Vec<Value> = items
        .iter()
        .map(|(title, url)| json!({"title": title, "url": url}))
        .collect();
    json!({ "userId": user_id, "bookmarks": bookmarks })
}

async fn urls_for(db: &Database, user_id: i64) -> Vec<String> {
    let mut urls: Vec<String> = db
        .bookmarks_for_user(user_id)
        .await
        .expect("read bookmarks")
        .into_iter()
        .map(|b| b.url)
        .collect();
    urls.sort();
    urls
}

// --------------------------------------------------------------------
// registration / login
// --------------------------------------------------------------------

#[tokio::test]
async fn register_then_login_by_username_and_email() {
    let db = test_db().await;
    let id = seed_user(&db, "ada").await;

    let by_username = auth::verify_login(&db, "ada", "hunter2").await.unwrap();
    assert_eq!(by_username.id, id);

    let by_email = auth::verify_login(&db, "ada@example.com", "hunter2")
        .await
        .unwrap();
    assert_eq!(by_email.id, id);
}

#[tokio::test]
async fn wrong_password_and_unknown_login_are_rejected() {
    let db = test_db().await;
    seed_user(&db, "ada").await;

    assert!(matches!(
        auth::verify_login(&db, "ada", "wrong").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        auth::verify_login(&db, "nobody", "hunter2").await,
        Err(AuthError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn duplicate_username_and_email_are_rejected() {
    let db = test_db().await;
    seed_user(&db, "ada").await;

    let same_username = auth::create_user(
        &db,
        RegisterUser {
            name: "other".to_string(),
            username: "ada".to_string(),
            email: "other@example.com".to_string(),
            password: "pw".to_string(),
        },
    )
    .await;
    assert!(matches!(same_username, Err(AuthError::DuplicateField("username"))));

    let same_email = auth::create_user(
        &db,
        RegisterUser {
            name: "other".to_string(),
            username: "other".to_string(),
            email: "ada@example.com".to_string(),
            password: "pw".to_string(),
        },
    )
    .await;
    assert!(matches!(same_email, Err(AuthError::DuplicateField("email"))));
}

// --------------------------------------------------------------------
// sync coordinator properties
// --------------------------------------------------------------------

#[tokio::test]
async fn sync_is_idempotent() {
    let db = test_db().await;
    let id = seed_user(&db, "ada").await;
    let body = payload(id, &[("A", "https://a.example"), ("B", "https://b.example")]);

    sync::sync(&db, &body).await.unwrap();
    let first = urls_for(&db, id).await;

    sync::sync(&db, &body).await.unwrap();
    let second = urls_for(&db, id).await;

    assert_eq!(first, second);
    assert_eq!(first, vec!["https://a.example", "https://b.example"]);
}

#[tokio::test]
async fn sync_fully_replaces_prior_set() {
    let db = test_db().await;
    let id = seed_user(&db, "ada").await;

    sync::sync(&db, &payload(id, &[("A", "https://a.example"), ("B", "https://b.example")]))
        .await
        .unwrap();
    sync::sync(&db, &payload(id, &[("C", "https://c.example")]))
        .await
        .unwrap();

    // no residue from the first set
    assert_eq!(urls_for(&db, id).await, vec!["https://c.example"]);
}

#[tokio::test]
async fn empty_sync_clears_all_bookmarks() {
    let db = test_db().await;
    let id = seed_user(&db, "ada").await;

    sync::sync(&db, &payload(id, &[("A", "https://a.example")]))
        .await
        .unwrap();
    let ack = sync::sync(&db, &payload(id, &[])).await.unwrap();

    assert_eq!(ack.synced, 0);
    assert!(urls_for(&db, id).await.is_empty());
}

#[tokio::test]
async fn within_batch_duplicate_urls_collapse_to_first_occurrence() {
    let db = test_db().await;
    let id = seed_user(&db, "ada").await;

    let ack = sync::sync(
        &db,
        &payload(id, &[("first title", "https://dup.example"), ("second title", "https://dup.example")]),
    )
    .await
    .unwrap();

    assert_eq!(ack.synced, 1);
    let bookmarks = db.bookmarks_for_user(id).await.unwrap();
    assert_eq!(bookmarks.len(), 1);
    assert_eq!(bookmarks[0].title, "first title");
}

#[tokio::test]
async fn sync_never_touches_other_users() {
    let db = test_db().await;
    let ada = seed_user(&db, "ada").await;
    let bob = seed_user(&db, "bob").await;

    sync::sync(&db, &payload(bob, &[("B", "https://bob.example")]))
        .await
        .unwrap();
    sync::sync(&db, &payload(ada, &[("A", "https://ada.example")]))
        .await
        .unwrap();
    sync::sync(&db, &payload(ada, &[])).await.unwrap();

    assert!(urls_for(&db, ada).await.is_empty());
    assert_eq!(urls_for(&db, bob).await, vec!["https://bob.example"]);
}

#[tokio::test]
async fn invalid_payloads_are_rejected_without_mutation() {
    let db = test_db().await;
    let id = seed_user(&db, "ada").await;
    sync::sync(&db, &payload(id, &[("A", "https://a.example")]))
        .await
        .unwrap();

    let bad_bodies = [
        json!({ "bookmarks": [] }),
        json!({ "userId": id, "bookmarks": "not-a-list" }),
        json!({ "userId": id }),
        json!({ "userId": id, "bookmarks": [{"title": "", "url": "https://x.example"}] }),
        json!({ "userId": id + 999, "bookmarks": [] }),
    ];
    for body in &bad_bodies {
        let err = sync::sync(&db, body).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidPayload(_)), "body: {body}");
    }

    // every rejection left the stored set untouched
    assert_eq!(urls_for(&db, id).await, vec!["https://a.example"]);
}

#[tokio::test]
async fn failed_replace_rolls_back_to_prior_set() {
    let db = test_db().await;
    let id = seed_user(&db, "ada").await;
    sync::sync(&db, &payload(id, &[("A", "https://a.example"), ("B", "https://b.example")]))
        .await
        .unwrap();

    // drive the store layer directly, past coordinator validation: the
    // empty url violates the schema CHECK mid-batch, after the delete and
    // the first insert already succeeded
    let items = vec![
        BookmarkItem {
            title: "C".to_string(),
            url: "https://c.example".to_string(),
        },
        BookmarkItem {
            title: "broken".to_string(),
            url: String::new(),
        },
    ];
    let result = db.replace_bookmarks(id, &items).await;
    assert!(result.is_err());

    // all-or-nothing: the pre-call set survived
    assert_eq!(
        urls_for(&db, id).await,
        vec!["https://a.example", "https://b.example"]
    );
}

#[tokio::test]
async fn only_url_conflicts_are_skipped_other_violations_fail_the_batch() {
    let db = test_db().await;
    let id = seed_user(&db, "ada").await;
    sync::sync(&db, &payload(id, &[("A", "https://a.example")]))
        .await
        .unwrap();

    // a duplicate url is the expected collapse, but the empty-title row
    // must fail the insert rather than be silently dropped
    let items = vec![
        BookmarkItem {
            title: "B".to_string(),
            url: "https://b.example".to_string(),
        },
        BookmarkItem {
            title: "B again".to_string(),
            url: "https://b.example".to_string(),
        },
        BookmarkItem {
            title: String::new(),
            url: "https://c.example".to_string(),
        },
    ];
    assert!(db.replace_bookmarks(id, &items).await.is_err());
    assert_eq!(urls_for(&db, id).await, vec!["https://a.example"]);
}

// --------------------------------------------------------------------
// schema bootstrap
// --------------------------------------------------------------------

#[tokio::test]
async fn migrations_are_idempotent_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bokmerke.db");
    let path = path.to_str().unwrap();

    {
        let db = Database::open(path).await.unwrap();
        seed_user(&db, "ada").await;
    }

    // second open re-runs the migration pass against the recorded state
    let db = Database::open(path).await.unwrap();
    let user = db.find_user_by_identifier("ada").await.unwrap();
    assert!(user.is_some());
}
