use cairn_cloud::config::CloudConfig;
use cairn_cloud::uploader::BatchUploader;
use cairn_types::{Row, RowValue};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &[&str] = &["tenant_id", "project_id", "id"];

fn make_rows(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| {
            let mut row = Row::new();
            row.insert("id".to_string(), RowValue::Int(i as i64 + 1));
            row.insert("name".to_string(), RowValue::Text(format!("row-{i}")));
            row
        })
        .collect()
}

fn uploader_with(server: &MockServer, batch_size: usize) -> BatchUploader {
    let config = CloudConfig {
        batch_size,
        ..CloudConfig::test(server.uri())
    };
    BatchUploader::new(config)
}

#[tokio::test]
async fn rows_chunk_into_ceil_n_over_batch_size_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/cloud_files"))
        .respond_with(ResponseTemplate::new(201))
        .expect(3)
        .mount(&server)
        .await;

    let uploader = uploader_with(&server, 10);
    let errors = uploader
        .upload_table("cloud_files", KEY, &make_rows(25), "tok-1")
        .await;
    assert!(errors.is_empty());
}

#[tokio::test]
async fn exact_multiple_produces_exact_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/cloud_files"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let uploader = uploader_with(&server, 10);
    let errors = uploader
        .upload_table("cloud_files", KEY, &make_rows(20), "tok-1")
        .await;
    assert!(errors.is_empty());
}

#[tokio::test]
async fn zero_rows_issue_no_requests() {
    let server = MockServer::start().await;
    let uploader = uploader_with(&server, 10);
    let errors = uploader.upload_table("cloud_files", KEY, &[], "tok-1").await;
    assert!(errors.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_token_fails_before_any_network_call() {
    let server = MockServer::start().await;
    let uploader = uploader_with(&server, 10);
    let errors = uploader
        .upload_table("cloud_files", KEY, &make_rows(5), "")
        .await;
    assert_eq!(errors.len(), 1);
    assert!(!errors[0].is_retryable());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn request_carries_upsert_headers_and_conflict_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/cloud_files"))
        .and(query_param("on_conflict", "tenant_id,project_id,id"))
        .and(header("Authorization", "Bearer tok-1"))
        .and(header("Prefer", "resolution=merge-duplicates,return=minimal"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let uploader = uploader_with(&server, 10);
    let errors = uploader
        .upload_table("cloud_files", KEY, &make_rows(1), "tok-1")
        .await;
    assert!(errors.is_empty());
}

#[tokio::test]
async fn every_row_is_stamped_with_configured_identity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    // A malformed local row claiming another tenant must be overwritten.
    let mut rows = make_rows(2);
    rows[0].insert(
        "tenant_id".to_string(),
        RowValue::Text("someone-else".into()),
    );
    rows[0].insert("project_id".to_string(), RowValue::Text("evil".into()));

    let uploader = uploader_with(&server, 10);
    let errors = uploader.upload_table("cloud_files", KEY, &rows, "tok-1").await;
    assert!(errors.is_empty());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Vec<serde_json::Value> = requests[0].body_json().unwrap();
    assert_eq!(body.len(), 2);
    for uploaded in &body {
        assert_eq!(uploaded["tenant_id"], "tenant-test");
        assert_eq!(uploaded["project_id"], "project-test");
    }
}

#[tokio::test]
async fn four_xx_classified_non_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(422).set_body_string("column \"bogus\" does not exist"),
        )
        .mount(&server)
        .await;

    let uploader = uploader_with(&server, 10);
    let errors = uploader
        .upload_table("cloud_files", KEY, &make_rows(3), "tok-1")
        .await;
    assert_eq!(errors.len(), 1);
    assert!(!errors[0].is_retryable());
    assert!(errors[0].to_string().contains("422"));
}

#[tokio::test]
async fn five_xx_classified_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let uploader = uploader_with(&server, 10);
    let errors = uploader
        .upload_table("cloud_files", KEY, &make_rows(3), "tok-1")
        .await;
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_retryable());
}

#[tokio::test]
async fn transport_failure_classified_retryable() {
    // Point at a port nothing listens on.
    let config = CloudConfig {
        request_timeout_secs: 1,
        ..CloudConfig::test("http://127.0.0.1:9")
    };
    let uploader = BatchUploader::new(config);
    let errors = uploader
        .upload_table("cloud_files", KEY, &make_rows(1), "tok-1")
        .await;
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_retryable());
}

#[tokio::test]
async fn one_failed_batch_reports_only_itself() {
    let server = MockServer::start().await;
    // First batch rejected, the rest accepted.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = CloudConfig {
        batch_size: 10,
        max_concurrent_batches: 1,
        ..CloudConfig::test(server.uri())
    };
    let uploader = BatchUploader::new(config);
    let errors = uploader
        .upload_table("cloud_files", KEY, &make_rows(30), "tok-1")
        .await;
    assert_eq!(errors.len(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn blob_values_serialize_as_hex_on_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut row = Row::new();
    row.insert("id".to_string(), RowValue::Int(1));
    row.insert("payload".to_string(), RowValue::Blob(vec![0x0F, 0xF0]));

    let uploader = uploader_with(&server, 10);
    let errors = uploader
        .upload_table("cloud_files", KEY, &[row], "tok-1")
        .await;
    assert!(errors.is_empty());

    let requests = server.received_requests().await.unwrap();
    let body: Vec<serde_json::Value> = requests[0].body_json().unwrap();
    assert_eq!(body[0]["payload"], "0ff0");
}
