// Dropbox HTTP client tests
//
// A wiremock server stands in for both the RPC host and the content host.

use cvisb_dbx::config::config::DropboxConfig;
use cvisb_dbx::dropbox::client::DropboxClient;
use cvisb_dbx::dropbox::types::{Metadata, WriteMode};
use cvisb_dbx::dropbox::{FileStore, MAX_UPLOAD_BYTES, create_data_folders};
use cvisb_dbx::error::AppError;
use cvisb_dbx::observability::RunMetrics;
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::matchers::{body_bytes, body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const TOKEN: &str = "test-token";

fn client_for(server: &MockServer) -> DropboxClient {
    let config = DropboxConfig {
        token: TOKEN.into(),
        api_url: server.uri(),
        content_url: server.uri(),
        ..Default::default()
    };
    DropboxClient::new(&config).unwrap()
}

fn file_json(name: &str, folder: &str, modified: &str) -> Value {
    json!({
        ".tag": "file",
        "name": name,
        "id": format!("id:{}", name),
        "path_lower": format!("{}/{}", folder, name).to_lowercase(),
        "path_display": format!("{}/{}", folder, name),
        "client_modified": modified,
        "server_modified": modified,
        "rev": "015a0f8c2b5c6c0000000001",
        "size": 24
    })
}

fn folder_json(name: &str, parent: &str) -> Value {
    json!({
        ".tag": "folder",
        "name": name,
        "id": format!("id:{}", name),
        "path_lower": format!("{}/{}", parent, name).to_lowercase(),
        "path_display": format!("{}/{}", parent, name)
    })
}

/// 解析 `Dropbox-API-Arg` 头并与期望的 JSON 比较
fn api_arg_is(expected: Value) -> impl Fn(&Request) -> bool + Send + Sync {
    move |request: &Request| {
        request
            .headers
            .get("Dropbox-API-Arg")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| serde_json::from_str::<Value>(s).ok())
            .is_some_and(|v| v == expected)
    }
}

#[tokio::test]
async fn test_current_account() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/users/get_current_account"))
        .and(header("Authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "account_id": "dbid:AAH4f99T0taONIb-OurWxbNQ6ywGRopQngc",
            "name": {
                "given_name": "Franz",
                "surname": "Ferdinand",
                "familiar_name": "Franz",
                "display_name": "Franz Ferdinand (Personal)",
                "abbreviated_name": "FF"
            },
            "email": "franz@example.com",
            "email_verified": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let account = client_for(&server).current_account().await.unwrap();
    assert_eq!(account.name.display_name, "Franz Ferdinand (Personal)");
    assert_eq!(account.email, "franz@example.com");
}

#[tokio::test]
async fn test_list_folder_follows_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .and(body_json(json!({ "path": "/CViSB_test", "recursive": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [folder_json("Data", "/CViSB_test")],
            "cursor": "cursor-1",
            "has_more": true
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder/continue"))
        .and(body_json(json!({ "cursor": "cursor-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [file_json("expt_list.csv", "/CViSB_test", "2018-03-16T10:00:00Z")],
            "cursor": "cursor-2",
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    // trailing slash is stripped before the request
    let entries = client_for(&server).list_folder("/CViSB_test/").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].is_folder());
    assert_eq!(entries[1].name(), "expt_list.csv");
    assert_eq!(entries[1].as_file().unwrap().size, 24);
}

#[tokio::test]
async fn test_list_root_uses_empty_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .and(body_json(json!({ "path": "", "recursive": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [],
            "cursor": "c",
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client_for(&server).list_folder("/").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_conflict_and_not_found_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/get_metadata"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error_summary": "path/not_found/..",
            "error": { ".tag": "path", "path": { ".tag": "not_found" } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/create_folder_v2"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error_summary": "path/conflict/folder/..",
            "error": { ".tag": "path", "path": { ".tag": "conflict" } }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_metadata("/missing.csv").await.unwrap_err();
    assert!(err.is_not_found());

    let err = client.create_folder("/CViSB_test/Data").await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ref s) if s.starts_with("path/conflict")));
}

#[tokio::test]
async fn test_auth_and_rate_limit_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/users/get_current_account"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error_summary": "invalid_access_token/...",
            "error": { ".tag": "invalid_access_token" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/get_metadata"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(matches!(
        client.current_account().await,
        Err(AppError::Authentication(_))
    ));
    assert!(matches!(
        client.list_folder("/x").await,
        Err(AppError::RateLimited)
    ));
    assert!(matches!(
        client.get_metadata("/x").await,
        Err(AppError::Api { status: 500, ref body }) if body == "boom"
    ));
}

#[tokio::test]
async fn test_upload_sends_arg_header_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .and(header("Content-Type", "application/octet-stream"))
        .and(api_arg_is(json!({
            "path": "/CViSB_test/Data/ELISA/fakeid0000_T1_ELISA.csv",
            "mode": "overwrite",
            "autorename": false,
            "mute": false
        })))
        .and(body_bytes(b"This is not a real file.".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json(
            "fakeid0000_T1_ELISA.csv",
            "/CViSB_test/Data/ELISA",
            "2018-03-16T12:00:00Z",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let meta = client_for(&server)
        .upload(
            b"This is not a real file.".to_vec(),
            "/CViSB_test/Data/ELISA/fakeid0000_T1_ELISA.csv",
            WriteMode::Overwrite,
        )
        .await
        .unwrap();
    assert_eq!(meta.name, "fakeid0000_T1_ELISA.csv");
}

#[tokio::test]
async fn test_upload_non_ascii_path_is_escaped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .and(|request: &Request| {
            request
                .headers
                .get("Dropbox-API-Arg")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|s| s.is_ascii() && s.contains(r"/Donn\u00e9es/\u00e9.csv"))
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json(
            "é.csv",
            "/Données",
            "2018-03-16T12:00:00Z",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let meta = client_for(&server)
        .upload(b"x".to_vec(), "/Données/é.csv", WriteMode::Add)
        .await
        .unwrap();
    assert_eq!(meta.name, "é.csv");
}

#[tokio::test]
async fn test_oversized_upload_rejected_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .upload(vec![0u8; MAX_UPLOAD_BYTES + 1], "/big.bin", WriteMode::Add)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PayloadTooLarge { .. }));
}

#[tokio::test]
async fn test_download_reads_result_header() {
    let server = MockServer::start().await;
    let meta = file_json("expt_list.csv", "/CViSB_test", "2018-03-16T10:00:00Z");
    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .and(api_arg_is(json!({ "path": "/CViSB_test/expt_list.csv" })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Dropbox-API-Result", meta.to_string().as_str())
                .set_body_bytes(b"expt_id,timepts\nELISA,1\n".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (meta, bytes) = client_for(&server)
        .download("/CViSB_test/expt_list.csv")
        .await
        .unwrap();
    assert_eq!(meta.name, "expt_list.csv");
    assert_eq!(bytes, b"expt_id,timepts\nELISA,1\n");
}

#[tokio::test]
async fn test_get_metadata_tags() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/get_metadata"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(folder_json("Data", "/CViSB_test")),
        )
        .mount(&server)
        .await;

    let meta = client_for(&server)
        .get_metadata("/CViSB_test/Data")
        .await
        .unwrap();
    assert!(matches!(meta, Metadata::Folder(ref f) if f.name == "Data"));
}

#[tokio::test]
async fn test_create_data_folders_skips_existing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/create_folder_v2"))
        .and(body_json(json!({ "path": "/CViSB_test/Data/ELISA", "autorename": false })))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error_summary": "path/conflict/folder/",
            "error": {}
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/create_folder_v2"))
        .respond_with(|request: &Request| {
            let arg: Value = serde_json::from_slice(&request.body).unwrap();
            let path = arg["path"].as_str().unwrap().to_string();
            let name = path.rsplit('/').next().unwrap().to_string();
            ResponseTemplate::new(200).set_body_json(json!({
                "metadata": {
                    "name": name,
                    "id": "id:new",
                    "path_lower": path.to_lowercase(),
                    "path_display": path
                }
            }))
        })
        .with_priority(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let created = create_data_folders(&client, "/CViSB_test").await.unwrap();
    assert_eq!(created.len(), 5);
    assert!(created.contains(&"/CViSB_test/Data/HLA Sequencing".to_string()));
    assert!(!created.iter().any(|p| p.ends_with("ELISA")));
}

#[tokio::test]
async fn test_fetch_shared_link_forces_direct_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/flfcc25nnqgr0t6/test2.csv"))
        .and(wiremock::matchers::query_param("dl", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a,b\n1,2\n"))
        .expect(1)
        .mount(&server)
        .await;

    let link = format!("{}/s/flfcc25nnqgr0t6/test2.csv?dl=0", server.uri());
    let bytes = client_for(&server).fetch_shared_link(&link).await.unwrap();
    assert_eq!(bytes, b"a,b\n1,2\n");
}

#[tokio::test]
async fn test_fetch_shared_link_counts_in_shared_metrics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/abc/roster.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("id\n1\n"))
        .mount(&server)
        .await;

    let metrics = Arc::new(RunMetrics::default());
    let client = client_for(&server).with_metrics(metrics.clone());
    let link = format!("{}/s/abc/roster.csv", server.uri());
    client.fetch_shared_link(&link).await.unwrap();

    let gathered = metrics.gather();
    assert!(gathered.contains("api_calls_total 1\n"));
    assert!(gathered.contains("downloads_total 1\n"));
    assert!(gathered.contains("bytes_downloaded 5\n"));
}
