use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;
use serde_json::Value as JsonValue;
use sql_fetch::prelude::*;
use sql_fetch::test_utils::{MockClient, cell, null_cell};

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u64,
    name: String,
    active: bool,
    score: Option<f64>,
}

impl AfterFetch for User {}

fn user_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("id", "BIGINT").nullability(Nullability::NotNull),
        ColumnDescriptor::new("name", "VARCHAR").nullability(Nullability::NotNull),
        ColumnDescriptor::new("active", "TINYINT"),
        ColumnDescriptor::new("score", "DOUBLE").nullability(Nullability::Nullable),
    ]
}

#[tokio::test]
async fn rows_materialize_through_weak_typing() -> Result<(), SqlFetchError> {
    let mut client = MockClient::new();
    client.queue_rows(
        user_columns(),
        vec![
            vec![cell("1"), cell("alice"), cell("1"), cell("2.5")],
            vec![cell("2"), cell("bob"), cell("0"), null_cell()],
        ],
    );

    let users: Vec<User> = statement(&mut client, "select * from users")
        .fetch_as()
        .await?;
    assert_eq!(
        users,
        vec![
            User {
                id: 1,
                name: "alice".into(),
                active: true,
                score: Some(2.5),
            },
            User {
                id: 2,
                name: "bob".into(),
                active: false,
                score: None,
            },
        ]
    );
    Ok(())
}

#[tokio::test]
async fn strict_decoding_rejects_string_cells() {
    let mut client = MockClient::new();
    client.queue_rows(
        user_columns(),
        vec![vec![cell("1"), cell("alice"), cell("1"), null_cell()]],
    );

    let err = statement(&mut client, "select * from users")
        .decode_config(DecodeConfig::strict())
        .fetch_as::<User>()
        .await
        .unwrap_err();
    assert!(matches!(err, SqlFetchError::Structural(_)));
}

#[tokio::test]
async fn a_failing_row_aborts_with_no_partial_results() {
    let mut client = MockClient::new();
    client.queue_rows(
        user_columns(),
        vec![
            vec![cell("1"), cell("alice"), cell("1"), null_cell()],
            vec![cell("not-a-number"), cell("bob"), cell("0"), null_cell()],
            vec![cell("3"), cell("carol"), cell("1"), null_cell()],
        ],
    );

    let err = statement(&mut client, "select * from users")
        .fetch_as::<User>()
        .await
        .unwrap_err();
    assert!(matches!(err, SqlFetchError::Structural(_)));
}

#[tokio::test]
async fn decode_hooks_rewrite_cells_before_population() -> Result<(), SqlFetchError> {
    let mut client = MockClient::new();
    client.queue_rows(
        user_columns(),
        vec![vec![cell("1"), cell("alice"), cell("1"), cell("n/a")]],
    );

    let hook: DecodeHook = Arc::new(|column, value| {
        if column == "score" && value == JsonValue::String("n/a".into()) {
            Ok(JsonValue::Null)
        } else {
            Ok(value)
        }
    });
    let users: Vec<User> = statement(&mut client, "select * from users")
        .decode_config(DecodeConfig::default().with_hook(hook))
        .fetch_as()
        .await?;
    assert_eq!(users[0].score, None);
    Ok(())
}

#[tokio::test]
async fn typed_single_result_unwraps() -> Result<(), SqlFetchError> {
    let mut client = MockClient::new();
    client.queue_rows(user_columns(), vec![]);
    let none: Option<User> = statement(&mut client, "select * from users where 1=0")
        .fetch_one_as()
        .await?;
    assert!(none.is_none());

    client.queue_rows(
        user_columns(),
        vec![vec![cell("9"), cell("zoe"), cell("1"), null_cell()]],
    );
    let user: Option<User> = statement(&mut client, "select * from users limit 1")
        .fetch_one_as()
        .await?;
    assert_eq!(user.map(|u| u.id), Some(9));
    Ok(())
}

#[tokio::test]
async fn the_post_fetch_callback_runs_before_hooks() -> Result<(), SqlFetchError> {
    let mut client = MockClient::new();
    client.queue_rows(
        user_columns(),
        vec![vec![cell("1"), cell("alice"), cell("1"), null_cell()]],
    );

    let released = Arc::new(AtomicUsize::new(0));
    let released_in_callback = Arc::clone(&released);
    let callback: PostFetch = Arc::new(move |_cancel| {
        released_in_callback.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let users: Vec<User> = statement(&mut client, "select * from users")
        .post_fetch(callback)
        .fetch_as()
        .await?;
    assert_eq!(users.len(), 1);
    assert_eq!(released.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn a_failing_post_fetch_callback_aborts_the_call() {
    let mut client = MockClient::new();
    client.queue_rows(
        user_columns(),
        vec![vec![cell("1"), cell("alice"), cell("1"), null_cell()]],
    );

    let callback: PostFetch =
        Arc::new(|_cancel| Err(SqlFetchError::Execution("release failed".into())));
    let err = statement(&mut client, "select * from users")
        .post_fetch(callback)
        .fetch_as::<User>()
        .await
        .unwrap_err();
    assert!(matches!(err, SqlFetchError::Execution(_)));
}
