use sql_fetch::prelude::*;
use sql_fetch::test_utils::{MockClient, cell};

fn datetime_columns() -> Vec<ColumnDescriptor> {
    vec![ColumnDescriptor::new("at", "DATETIME")]
}

#[tokio::test]
async fn the_cursor_is_closed_after_a_successful_drain() -> Result<(), SqlFetchError> {
    let mut client = MockClient::new();
    client.queue_rows(
        datetime_columns(),
        vec![vec![cell("2024-03-01 10:30:00")]],
    );

    let rows = statement(&mut client, "select at from t").fetch_rows().await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(client.close_count(), 1);
    Ok(())
}

#[tokio::test]
async fn a_decode_failure_mid_drain_still_closes_the_cursor_once() {
    let mut client = MockClient::new();
    let rows = vec![
        vec![cell("2024-03-01 10:30:00")],
        vec![cell("not a timestamp")],
        vec![cell("2024-03-03 10:30:00")],
        vec![cell("2024-03-04 10:30:00")],
        vec![cell("2024-03-05 10:30:00")],
    ];
    client.queue_rows(datetime_columns(), rows);

    let err = statement(&mut client, "select at from t")
        .fetch_rows()
        .await
        .unwrap_err();
    assert!(matches!(err, SqlFetchError::Decode { .. }));
    assert_eq!(client.close_count(), 1);
}

#[tokio::test]
async fn a_scan_failure_still_closes_the_cursor_once() {
    let mut client = MockClient::new();
    client.fail_scan_at(1);
    client.queue_rows(
        datetime_columns(),
        vec![
            vec![cell("2024-03-01 10:30:00")],
            vec![cell("2024-03-02 10:30:00")],
        ],
    );

    let err = statement(&mut client, "select at from t")
        .fetch_rows()
        .await
        .unwrap_err();
    assert!(matches!(err, SqlFetchError::Execution(_)));
    assert_eq!(client.close_count(), 1);
}

#[tokio::test]
async fn the_decode_error_wins_over_a_close_error() {
    let mut client = MockClient::new();
    client.fail_close();
    client.queue_rows(datetime_columns(), vec![vec![cell("garbage")]]);

    let err = statement(&mut client, "select at from t")
        .fetch_rows()
        .await
        .unwrap_err();
    assert!(matches!(err, SqlFetchError::Decode { .. }));
    assert_eq!(client.close_count(), 1);
}

#[tokio::test]
async fn a_close_error_on_a_clean_drain_surfaces() {
    let mut client = MockClient::new();
    client.fail_close();
    client.queue_rows(
        datetime_columns(),
        vec![vec![cell("2024-03-01 10:30:00")]],
    );

    let err = statement(&mut client, "select at from t")
        .fetch_rows()
        .await
        .unwrap_err();
    assert!(matches!(err, SqlFetchError::Execution(_)));
    assert_eq!(client.close_count(), 1);
}
