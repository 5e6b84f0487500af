//! Bucket inventory pipeline against a mocked Cloud Storage API
//!
//! Covers listing with pagination, tolerant enrichment (absent labels,
//! forbidden or rejected ACL reads) and the CSV produced at the end.

use gcpinv::gcp::auth::GcpCredentials;
use gcpinv::gcp::client::{Endpoints, GcpClient};
use gcpinv::inventory::buckets::{collect_buckets, BUCKET_COLUMNS};
use gcpinv::inventory::export::write_csv_to;
use gcpinv::inventory::{
    export_buckets, BucketOptions, Cell, CreationDateSource, RecordingConsole,
};
use serde_json::json;
use wiremock::matchers::{bearer_token, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: &str = "inventory-prod";

fn client_for(server: &MockServer) -> GcpClient {
    GcpClient::with_credentials(
        PROJECT,
        GcpCredentials::from_token("test-token"),
        Endpoints::single(&server.uri()),
    )
    .expect("client should build")
}

fn gcs_error(code: u16, reason: &str) -> ResponseTemplate {
    ResponseTemplate::new(code).set_body_json(json!({
        "error": {
            "code": code,
            "message": format!("{} error", reason),
            "errors": [{"reason": reason}]
        }
    }))
}

async fn mount_listing(server: &MockServer, names: &[&str]) {
    let items: Vec<_> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            json!({
                "kind": "storage#bucket",
                "name": name,
                "timeCreated": format!("2023-01-{:02}T10:30:00.000Z", i + 1)
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/storage/v1/b"))
        .and(query_param("project", PROJECT))
        .and(bearer_token("test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "storage#buckets",
            "items": items
        })))
        .mount(server)
        .await;
}

async fn mount_acl(server: &MockServer, bucket: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/storage/v1/b/{}/acl", bucket)))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_labels(server: &MockServer, bucket: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/storage/v1/b/{}", bucket)))
        .and(query_param("fields", "labels"))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Bucket A has two labels; bucket B has none and its ACL read is denied
async fn mount_two_bucket_scenario(server: &MockServer) {
    mount_listing(server, &["bucket-a", "bucket-b"]).await;
    mount_acl(
        server,
        "bucket-a",
        ResponseTemplate::new(200).set_body_json(json!({
            "kind": "storage#bucketAccessControls",
            "items": [
                {"entity": "project-owners-123456789012", "role": "OWNER"},
                {"role": "READER"}
            ]
        })),
    )
    .await;
    mount_labels(
        server,
        "bucket-a",
        ResponseTemplate::new(200).set_body_json(json!({"labels": {"team": "x", "env": "prod"}})),
    )
    .await;
    mount_acl(server, "bucket-b", gcs_error(403, "forbidden")).await;
    mount_labels(server, "bucket-b", ResponseTemplate::new(200).set_body_json(json!({}))).await;
}

#[tokio::test]
async fn test_two_bucket_scenario() {
    let server = MockServer::start().await;
    mount_two_bucket_scenario(&server).await;

    let client = client_for(&server);
    let mut console = RecordingConsole::new();
    let table = collect_buckets(&client, &BucketOptions::default(), &mut console)
        .await
        .expect("inventory should succeed");

    assert_eq!(
        table.header(),
        vec!["Name", "CreationDate", "Access", "Tag env", "Tag team"]
    );
    assert_eq!(table.len(), 2);

    let rows: Vec<Vec<&Cell>> = table.rows().collect();
    assert_eq!(rows[0][0], &Cell::text("bucket-a"));
    assert_eq!(rows[0][1], &Cell::text("2023-01-01T10:30:00.000Z"));
    assert_eq!(
        rows[0][2],
        &Cell::text("project-owners-123456789012, N/A")
    );
    assert_eq!(rows[0][3], &Cell::text("prod"));
    assert_eq!(rows[0][4], &Cell::text("x"));

    assert_eq!(rows[1][0], &Cell::text("bucket-b"));
    assert_eq!(rows[1][2], &Cell::text("-"));
    assert_eq!(rows[1][3], &Cell::Empty);
    assert_eq!(rows[1][4], &Cell::Empty);

    assert_eq!(
        console.notices,
        vec!["Skipped access for bucket 'bucket-b' due to insufficient permissions.".to_string()]
    );
    assert_eq!(console.progress.last(), Some(&(2, 2)));
}

#[tokio::test]
async fn test_export_writes_csv_and_is_idempotent() {
    let server = MockServer::start().await;
    mount_two_bucket_scenario(&server).await;

    let client = client_for(&server);
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");

    let rows = export_buckets(&client, &BucketOptions::default(), &first, &mut RecordingConsole::new())
        .await
        .unwrap();
    export_buckets(&client, &BucketOptions::default(), &second, &mut RecordingConsole::new())
        .await
        .unwrap();

    assert_eq!(rows, 2);
    let first = std::fs::read(&first).unwrap();
    let second = std::fs::read(&second).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        String::from_utf8(first).unwrap(),
        "Name,CreationDate,Access,Tag env,Tag team\n\
         bucket-a,2023-01-01T10:30:00.000Z,\"project-owners-123456789012, N/A\",prod,x\n\
         bucket-b,2023-01-02T10:30:00.000Z,-,,\n"
    );
}

#[tokio::test]
async fn test_missing_labels_add_no_columns_and_no_notice() {
    let server = MockServer::start().await;
    mount_listing(&server, &["plain"]).await;
    mount_acl(
        &server,
        "plain",
        ResponseTemplate::new(200).set_body_json(json!({"items": [{"entity": "allUsers"}]})),
    )
    .await;
    mount_labels(&server, "plain", gcs_error(404, "notFound")).await;

    let mut console = RecordingConsole::new();
    let table = collect_buckets(&client_for(&server), &BucketOptions::default(), &mut console)
        .await
        .unwrap();

    assert_eq!(table.header(), BUCKET_COLUMNS.to_vec());
    assert!(table.discovered_columns().is_empty());
    assert_eq!(table.records()[0].get("Access"), Some(&Cell::text("allUsers")));
    assert!(console.notices.is_empty());
}

#[tokio::test]
async fn test_uniform_bucket_level_access_is_reported_not_fatal() {
    let server = MockServer::start().await;
    mount_listing(&server, &["ubla"]).await;
    mount_acl(&server, "ubla", gcs_error(400, "invalid")).await;
    mount_labels(
        &server,
        "ubla",
        ResponseTemplate::new(200).set_body_json(json!({"labels": {"owner": "data"}})),
    )
    .await;

    let mut console = RecordingConsole::new();
    let table = collect_buckets(&client_for(&server), &BucketOptions::default(), &mut console)
        .await
        .unwrap();

    let record = &table.records()[0];
    assert_eq!(record.get("Access"), Some(&Cell::text("-")));
    assert_eq!(record.get("Tag owner"), Some(&Cell::text("data")));
    assert_eq!(
        console.notices,
        vec!["Skipped access for bucket 'ubla' due to a bad request.".to_string()]
    );
}

#[tokio::test]
async fn test_fatal_enrichment_error_aborts_without_output() {
    let server = MockServer::start().await;
    mount_listing(&server, &["broken"]).await;
    mount_acl(&server, "broken", gcs_error(500, "backendError")).await;
    mount_labels(&server, "broken", ResponseTemplate::new(200).set_body_json(json!({}))).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("buckets.csv");
    let result = export_buckets(
        &client_for(&server),
        &BucketOptions::default(),
        &output,
        &mut RecordingConsole::new(),
    )
    .await;

    assert!(result.is_err());
    assert!(!output.exists());
}

#[tokio::test]
async fn test_skip_failed_drops_only_the_failing_bucket() {
    let server = MockServer::start().await;
    mount_listing(&server, &["broken", "fine"]).await;
    mount_acl(&server, "broken", gcs_error(500, "backendError")).await;
    mount_acl(
        &server,
        "fine",
        ResponseTemplate::new(200).set_body_json(json!({"items": []})),
    )
    .await;
    mount_labels(&server, "fine", ResponseTemplate::new(200).set_body_json(json!({}))).await;

    let options = BucketOptions {
        skip_failed: true,
        ..Default::default()
    };
    let mut console = RecordingConsole::new();
    let table = collect_buckets(&client_for(&server), &options, &mut console)
        .await
        .unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(table.records()[0].get("Name"), Some(&Cell::text("fine")));
    assert_eq!(table.records()[0].get("Access"), Some(&Cell::text("")));
    assert_eq!(console.notices.len(), 1);
    assert!(console.notices[0].starts_with("Skipped bucket 'broken'"));
    assert_eq!(console.progress.last(), Some(&(2, 2)));
}

#[tokio::test]
async fn test_listing_follows_page_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/storage/v1/b"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"name": "page-one"}],
            "nextPageToken": "token-2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/storage/v1/b"))
        .and(query_param("pageToken", "token-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"name": "page-two"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    for bucket in ["page-one", "page-two"] {
        mount_acl(&server, bucket, ResponseTemplate::new(200).set_body_json(json!({}))).await;
        mount_labels(&server, bucket, ResponseTemplate::new(200).set_body_json(json!({}))).await;
    }

    let table = collect_buckets(
        &client_for(&server),
        &BucketOptions::default(),
        &mut RecordingConsole::new(),
    )
    .await
    .unwrap();

    let names: Vec<_> = table
        .records()
        .iter()
        .map(|r| r.get("Name").unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["page-one", "page-two"]);
    // Listed without timeCreated
    assert_eq!(table.records()[0].get("CreationDate"), Some(&Cell::text("-")));
}

#[tokio::test]
async fn test_repeated_page_token_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/storage/v1/b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [],
            "nextPageToken": "stuck"
        })))
        .mount(&server)
        .await;

    let result = collect_buckets(
        &client_for(&server),
        &BucketOptions::default(),
        &mut RecordingConsole::new(),
    )
    .await;

    let err = result.expect_err("a stuck cursor must not end the listing silently");
    assert!(format!("{:#}", err).contains("page token 'stuck' was returned twice"));
}

#[tokio::test]
async fn test_listing_error_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/storage/v1/b"))
        .respond_with(gcs_error(403, "forbidden"))
        .mount(&server)
        .await;

    let mut console = RecordingConsole::new();
    let result = collect_buckets(&client_for(&server), &BucketOptions::default(), &mut console).await;

    assert!(result.is_err());
    assert!(console.notices.is_empty());
}

#[tokio::test]
async fn test_response_date_creation_source() {
    let server = MockServer::start().await;
    mount_listing(&server, &["dated"]).await;
    mount_acl(&server, "dated", ResponseTemplate::new(200).set_body_json(json!({}))).await;
    mount_labels(&server, "dated", ResponseTemplate::new(200).set_body_json(json!({}))).await;

    Mock::given(method("GET"))
        .and(path("/storage/v1/b/dated"))
        .and(query_param("fields", "name"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Date", "Wed, 01 May 2024 12:00:00 GMT")
                .set_body_json(json!({"name": "dated"})),
        )
        .mount(&server)
        .await;

    let options = BucketOptions {
        creation_date: CreationDateSource::ResponseDate,
        ..Default::default()
    };
    let table = collect_buckets(&client_for(&server), &options, &mut RecordingConsole::new())
        .await
        .unwrap();

    assert_eq!(
        table.records()[0].get("CreationDate"),
        Some(&Cell::text("Wed, 01 May 2024 12:00:00 GMT"))
    );

    let mut out = Vec::new();
    write_csv_to(&table, &mut out).unwrap();
    assert!(String::from_utf8(out)
        .unwrap()
        .contains("\"Wed, 01 May 2024 12:00:00 GMT\""));
}
