//! Integration tests against a live Postgres.
//!
//! Run with a throwaway database:
//!
//! ```sh
//! KEYHOLE_TEST_POSTGRES_DSN=postgres://postgres@localhost/keyhole_test \
//!     cargo test -p keyhole-storage -- --ignored
//! ```

use keyhole_core::{DeleteRequest, Repository, ShortCode, StorageError, UsageStats};
use keyhole_storage::PostgresRepository;
use std::collections::HashMap;

const DSN_ENV: &str = "KEYHOLE_TEST_POSTGRES_DSN";

async fn fixture() -> PostgresRepository {
    let dsn = std::env::var(DSN_ENV)
        .unwrap_or_else(|_| panic!("{DSN_ENV} must point at a throwaway database"));
    let repo = PostgresRepository::connect(&dsn).await.expect("connect postgres");
    sqlx::query("TRUNCATE url_records")
        .execute(repo.pool())
        .await
        .expect("truncate");
    repo
}

fn code(s: &str) -> ShortCode {
    ShortCode::new_unchecked(s)
}

fn delete(c: &str, owner: &str) -> DeleteRequest {
    DeleteRequest {
        code: code(c),
        owner_id: owner.to_owned(),
    }
}

#[tokio::test]
#[ignore = "needs a live postgres, see module docs"]
async fn save_find_and_collision_translation() {
    let repo = fixture().await;

    repo.save_one(&code("abcDEF12"), "https://a.com", "u1")
        .await
        .unwrap();

    let record = repo.find_by_code(&code("abcDEF12")).await.unwrap().unwrap();
    assert_eq!(record.original_url, "https://a.com");
    assert!(!record.deleted);

    let err = repo
        .save_one(&code("abcDEF12"), "https://b.com", "u1")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::CodeCollision(_)));

    let err = repo
        .save_one(&code("zzzzzzz9"), "https://a.com", "u2")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::UrlAlreadyMapped(_)));

    assert_eq!(
        repo.find_by_original("https://a.com").await.unwrap(),
        Some(code("abcDEF12"))
    );
}

#[tokio::test]
#[ignore = "needs a live postgres, see module docs"]
async fn batch_list_and_stats() {
    let repo = fixture().await;

    let entries = HashMap::from([
        (code("AAAAAAAA"), "https://a.com".to_owned()),
        (code("BBBBBBBB"), "https://b.com".to_owned()),
    ]);
    repo.save_many(&entries, "u1").await.unwrap();
    repo.save_one(&code("CCCCCCCC"), "https://c.com", "u2")
        .await
        .unwrap();

    let owned = repo.list_by_owner("u1").await.unwrap();
    assert_eq!(owned.len(), 2);
    assert!(!owned.contains_key(&code("CCCCCCCC")));

    assert_eq!(
        repo.stats().await.unwrap(),
        UsageStats { urls: 3, users: 2 }
    );
}

#[tokio::test]
#[ignore = "needs a live postgres, see module docs"]
async fn mark_deleted_is_owner_scoped() {
    let repo = fixture().await;

    repo.save_one(&code("abcDEF12"), "https://a.com", "u1")
        .await
        .unwrap();

    // Wrong owner affects nothing.
    assert_eq!(repo.mark_deleted(&[delete("abcDEF12", "u2")]).await.unwrap(), 0);
    let record = repo.find_by_code(&code("abcDEF12")).await.unwrap().unwrap();
    assert!(!record.deleted);

    // Right owner flips the flag; the record stays resolvable.
    assert_eq!(repo.mark_deleted(&[delete("abcDEF12", "u1")]).await.unwrap(), 1);
    let record = repo.find_by_code(&code("abcDEF12")).await.unwrap().unwrap();
    assert!(record.deleted);
    assert_eq!(record.original_url, "https://a.com");
}

#[tokio::test]
#[ignore = "needs a live postgres, see module docs"]
async fn health_check_round_trips() {
    let repo = fixture().await;
    repo.health_check().await.unwrap();
}
