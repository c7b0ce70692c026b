//! End-to-end integration tests for Filedir.
//!
//! These tests bind a real server on an ephemeral port and drive it over HTTP:
//! - Listing, folder creation and deletion
//! - Uploads and byte-exact downloads
//! - Rename conflicts and error bodies
//! - Frontend and CORS handling

use std::fs;
use std::path::PathBuf;

use filedir::config::Config;
use filedir::HttpServer;
use protocol::{
    CreateFolderResponse, DeleteResponse, EntryKind, ErrorResponse, FileEntry, FileListResponse,
    HealthResponse, RenameResponse, UploadResponse,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::oneshot;

/// A running server plus the directories backing it.
struct TestServer {
    base: String,
    root: PathBuf,
    client: Client,
    _shutdown: oneshot::Sender<()>,
    _temp_dir: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    async fn start_with(customize: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let frontend = temp_dir.path().join("static");
        fs::create_dir_all(&frontend).unwrap();
        fs::write(frontend.join("index.html"), "<h1>Filedir</h1>").unwrap();
        fs::write(frontend.join("app.js"), "console.log('hi');").unwrap();

        let mut config = Config::default();
        config.server.port = 0;
        config.server.frontend_dir = frontend;
        config.storage.root_dir = temp_dir.path().join("uploads");
        customize(&mut config);

        let server = HttpServer::bind(config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let root = server.state().browser().root().to_path_buf();

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(server.serve(async {
            let _ = rx.await;
        }));

        Self {
            base: format!("http://{}", addr),
            root,
            client: Client::new(),
            _shutdown: tx,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn list(&self) -> Vec<FileEntry> {
        let response = self.client.get(self.url("/api/files")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response.json::<FileListResponse>().await.unwrap().files
    }

    async fn upload(&self, files: &[(&str, &[u8])]) -> reqwest::Response {
        let mut form = Form::new();
        for (name, data) in files {
            form = form.part(
                "files",
                Part::bytes(data.to_vec()).file_name(name.to_string()),
            );
        }
        self.client
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    async fn upload_one(&self, name: &str, data: &[u8]) -> FileEntry {
        let response = self.upload(&[(name, data)]).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: UploadResponse = response.json().await.unwrap();
        assert_eq!(body.files.len(), 1);
        body.files.into_iter().next().unwrap()
    }

    async fn create_folder(&self, name: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/folders"))
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap()
    }

    async fn rename(&self, id: &str, name: &str) -> reqwest::Response {
        self.client
            .put(self.url(&format!("/api/files/{}/rename", id)))
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap()
    }

    async fn info(&self, id: &str) -> reqwest::Response {
        self.client
            .get(self.url(&format!("/api/files/{}/info", id)))
            .send()
            .await
            .unwrap()
    }

    async fn delete(&self, id: &str) -> reqwest::Response {
        self.client
            .delete(self.url(&format!("/api/files/{}", id)))
            .send()
            .await
            .unwrap()
    }
}

async fn error_message(response: reqwest::Response) -> String {
    response.json::<ErrorResponse>().await.unwrap().error
}

// =============================================================================
// Health and Frontend Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await;

    let response = server.client.get(server.url("/api/health")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: HealthResponse = response.json().await.unwrap();
    assert_eq!(body.status, "Server is running");
}

#[tokio::test]
async fn test_frontend_served_at_root() {
    let server = TestServer::start().await;

    let response = server.client.get(server.url("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "<h1>Filedir</h1>");

    let response = server.client.get(server.url("/app.js")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let server = TestServer::start().await;

    let response = server
        .client
        .get(server.url("/api/health"))
        .header("Origin", "http://example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let server = TestServer::start_with(|config| config.server.cors = false).await;

    let response = server
        .client
        .get(server.url("/api/health"))
        .header("Origin", "http://example.com")
        .send()
        .await
        .unwrap();

    assert!(response.headers().get("access-control-allow-origin").is_none());
}

// =============================================================================
// Listing Tests
// =============================================================================

#[tokio::test]
async fn test_list_empty_root() {
    let server = TestServer::start().await;
    assert!(server.list().await.is_empty());
}

#[tokio::test]
async fn test_list_is_shallow_and_skips_hidden() {
    let server = TestServer::start().await;
    fs::create_dir_all(server.root.join("docs/nested")).unwrap();
    fs::write(server.root.join("docs/nested/deep.txt"), "deep").unwrap();
    fs::write(server.root.join("readme.txt"), "hello").unwrap();
    fs::write(server.root.join(".secret"), "hidden").unwrap();

    let files = server.list().await;
    let ids: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();

    assert_eq!(ids, vec!["docs", "readme.txt"]);
    assert_eq!(files[0].kind, EntryKind::Folder);
    assert_eq!(files[0].size, 0);
    assert_eq!(files[1].kind, EntryKind::Document);
    assert_eq!(files[1].size, 5);
}

#[tokio::test]
async fn test_list_fails_soft_when_root_vanishes() {
    let server = TestServer::start().await;
    fs::remove_dir_all(&server.root).unwrap();

    assert!(server.list().await.is_empty());
}

// =============================================================================
// Folder Tests
// =============================================================================

#[tokio::test]
async fn test_folder_scenario() {
    let server = TestServer::start().await;

    let response = server.create_folder("Reports").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: CreateFolderResponse = response.json().await.unwrap();
    assert!(body.success);
    assert_eq!(body.folder.id, "Reports");
    assert_eq!(body.folder.name, "Reports");
    assert_eq!(body.folder.kind, EntryKind::Folder);
    assert_eq!(body.folder.size, 0);

    let files = server.list().await;
    assert!(files
        .iter()
        .any(|f| f.name == "Reports" && f.kind == EntryKind::Folder && f.size == 0));

    let response = server.delete("Reports").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: DeleteResponse = response.json().await.unwrap();
    assert!(body.success);

    let response = server.info("Reports").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(response).await, "File not found");
}

#[tokio::test]
async fn test_create_folder_raw_json_shape() {
    let server = TestServer::start().await;

    let response = server.create_folder("Reports").await;
    let value: serde_json::Value = response.json().await.unwrap();

    assert_eq!(value["success"], true);
    assert_eq!(value["folder"]["id"], "Reports");
    assert_eq!(value["folder"]["type"], "folder");
    assert_eq!(value["folder"]["size"], 0);
    assert!(value["folder"]["created"].is_string());
    assert!(value["folder"]["modified"].is_string());
}

#[tokio::test]
async fn test_create_folder_empty_name() {
    let server = TestServer::start().await;

    let response = server.create_folder("   ").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Invalid folder name");
}

#[tokio::test]
async fn test_create_folder_missing_name_field() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/api/folders"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_folder_malformed_body() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/api/folders"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!error_message(response).await.is_empty());
}

#[tokio::test]
async fn test_create_folder_duplicate() {
    let server = TestServer::start().await;

    assert_eq!(server.create_folder("Reports").await.status(), StatusCode::OK);

    let response = server.create_folder("Reports").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Folder already exists");
}

#[tokio::test]
async fn test_create_folder_rejects_traversal() {
    let server = TestServer::start().await;

    let response = server.create_folder("../escape").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!server.root.parent().unwrap().join("escape").exists());
}

#[tokio::test]
async fn test_delete_non_empty_folder() {
    let server = TestServer::start().await;
    assert_eq!(server.create_folder("Archive").await.status(), StatusCode::OK);
    fs::create_dir_all(server.root.join("Archive/2023")).unwrap();
    fs::write(server.root.join("Archive/2023/q1.pdf"), "pdf").unwrap();
    fs::write(server.root.join("Archive/notes.txt"), "notes").unwrap();

    let response = server.delete("Archive").await;
    assert_eq!(response.status(), StatusCode::OK);

    assert!(!server.root.join("Archive").exists());
    assert!(server.list().await.iter().all(|f| f.id != "Archive"));
}

#[tokio::test]
async fn test_delete_missing() {
    let server = TestServer::start().await;

    let response = server.delete("ghost.txt").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(response).await, "File not found");
}

// =============================================================================
// Upload and Download Tests
// =============================================================================

#[tokio::test]
async fn test_upload_and_download_scenario() {
    let server = TestServer::start().await;

    let entry = server.upload_one("photo.png", &[0x89, 0x50, 0x4e]).await;
    assert_eq!(entry.kind, EntryKind::Image);
    assert_eq!(entry.size, 3);
    assert_eq!(entry.name, "photo.png");
    assert_ne!(entry.id, entry.name);

    let response = server
        .client
        .get(server.url(&format!("/api/download/{}", entry.id)))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(disposition, "attachment; filename=\"photo.png\"");
    assert_eq!(response.bytes().await.unwrap().as_ref(), &[0x89, 0x50, 0x4e]);
}

#[tokio::test]
async fn test_upload_response_shape() {
    let server = TestServer::start().await;

    let response = server.upload(&[("a.txt", &b"a"[..]), ("b.mp4", &b"bb"[..])]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: UploadResponse = response.json().await.unwrap();
    assert!(body.success);
    assert_eq!(body.files.len(), 2);
    assert_eq!(body.message, "Successfully uploaded 2 file(s)");
    assert_eq!(body.files[0].kind, EntryKind::Document);
    assert_eq!(body.files[1].kind, EntryKind::Video);
}

#[tokio::test]
async fn test_download_is_byte_identical() {
    let server = TestServer::start().await;
    let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

    let entry = server.upload_one("blob.bin", &payload).await;
    let bytes = server
        .client
        .get(server.url(&format!("/api/download/{}", entry.id)))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();

    assert_eq!(bytes.as_ref(), payload.as_slice());
}

#[tokio::test]
async fn test_upload_same_name_twice() {
    let server = TestServer::start().await;

    let first = server.upload_one("report.pdf", b"v1").await;
    let second = server.upload_one("report.pdf", b"v2").await;

    assert_ne!(first.id, second.id);
    assert_eq!(first.name, second.name);

    let files = server.list().await;
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.name == "report.pdf"));
}

#[tokio::test]
async fn test_upload_sanitizes_display_name() {
    let server = TestServer::start().await;

    let entry = server.upload_one("../../etc/passwd", b"root").await;

    assert_eq!(entry.name, "etc_passwd");
    assert!(server.root.join(&entry.id).is_file());
}

#[tokio::test]
async fn test_upload_long_file_name() {
    let server = TestServer::start().await;
    let long_name = format!("{}.png", "a".repeat(240));

    let response = server.upload(&[(long_name.as_str(), &b"abc"[..])]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: UploadResponse = response.json().await.unwrap();
    assert_eq!(body.files.len(), 1);
    let entry = &body.files[0];
    assert_eq!(entry.kind, EntryKind::Image);
    assert!(entry.name.ends_with(".png"));
    assert!(entry.id.len() <= 255);

    let bytes = server
        .client
        .get(server.url(&format!("/api/download/{}", entry.id)))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), b"abc");
}

#[tokio::test]
async fn test_upload_without_files_part() {
    let server = TestServer::start().await;

    let form = Form::new().text("note", "no files here");
    let response = server
        .client
        .post(server.url("/api/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "No files part");
}

#[tokio::test]
async fn test_upload_any_extension_by_default() {
    let server = TestServer::start().await;

    let entry = server.upload_one("setup.exe", b"MZ").await;
    assert_eq!(entry.kind, EntryKind::Default);
}

#[tokio::test]
async fn test_upload_enforced_allow_list_skips_file() {
    let server =
        TestServer::start_with(|config| config.storage.enforce_allowed_extensions = true).await;

    let response = server.upload(&[("setup.exe", &b"MZ"[..]), ("ok.txt", &b"ok"[..])]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: UploadResponse = response.json().await.unwrap();
    assert_eq!(body.files.len(), 1);
    assert_eq!(body.files[0].name, "ok.txt");
}

#[tokio::test]
async fn test_upload_over_limit_rejected() {
    let server = TestServer::start_with(|config| config.storage.max_upload_size = 64).await;

    let response = server.upload(&[("big.bin", &[7u8; 4096][..])]).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(server.list().await.is_empty());
}

#[tokio::test]
async fn test_download_missing() {
    let server = TestServer::start().await;

    let response = server
        .client
        .get(server.url("/api/download/nope.bin"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(response).await, "File not found");
}

#[tokio::test]
async fn test_download_folder_rejected() {
    let server = TestServer::start().await;
    fs::create_dir(server.root.join("docs")).unwrap();

    let response = server
        .client
        .get(server.url("/api/download/docs"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_pre_existing_file_uses_id_as_name() {
    let server = TestServer::start().await;
    fs::write(server.root.join("notes.txt"), "hello").unwrap();

    let response = server
        .client
        .get(server.url("/api/download/notes.txt"))
        .send()
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("content-disposition").unwrap(),
        "attachment; filename=\"notes.txt\""
    );
    assert_eq!(response.text().await.unwrap(), "hello");
}

#[tokio::test]
async fn test_encoded_traversal_id_not_found() {
    let server = TestServer::start().await;

    let response = server.info("..%2F..%2Fetc%2Fpasswd").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Rename and Info Tests
// =============================================================================

#[tokio::test]
async fn test_rename_moves_id() {
    let server = TestServer::start().await;
    let entry = server.upload_one("draft.txt", b"draft").await;

    let response = server.rename(&entry.id, "final.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: RenameResponse = response.json().await.unwrap();
    assert!(body.success);
    assert_eq!(body.new_id, "final.txt");

    let response = server.info("final.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    let info: FileEntry = response.json().await.unwrap();
    assert_eq!(info.id, "final.txt");
    assert_eq!(info.name, "final.txt");
    assert_eq!(info.size, 5);

    assert_eq!(server.info(&entry.id).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rename_to_existing_name() {
    let server = TestServer::start().await;
    fs::write(server.root.join("a.txt"), "A").unwrap();
    fs::write(server.root.join("b.txt"), "B").unwrap();

    let response = server.rename("a.txt", "b.txt").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Name already exists");

    assert_eq!(fs::read_to_string(server.root.join("a.txt")).unwrap(), "A");
    assert_eq!(fs::read_to_string(server.root.join("b.txt")).unwrap(), "B");
}

#[tokio::test]
async fn test_rename_empty_name() {
    let server = TestServer::start().await;
    fs::write(server.root.join("a.txt"), "A").unwrap();

    let response = server.rename("a.txt", "  ").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Invalid name");
}

#[tokio::test]
async fn test_rename_missing_source() {
    let server = TestServer::start().await;

    let response = server.rename("ghost.txt", "new.txt").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rename_folder() {
    let server = TestServer::start().await;
    assert_eq!(server.create_folder("Old").await.status(), StatusCode::OK);
    fs::write(server.root.join("Old/inside.txt"), "x").unwrap();

    let response = server.rename("Old", "New").await;
    assert_eq!(response.status(), StatusCode::OK);

    assert!(server.root.join("New/inside.txt").exists());
    let info: FileEntry = server.info("New").await.json().await.unwrap();
    assert_eq!(info.kind, EntryKind::Folder);
}

#[tokio::test]
async fn test_info_for_uploaded_file() {
    let server = TestServer::start().await;
    let entry = server.upload_one("song.mp3", b"ID3").await;

    let response = server.info(&entry.id).await;
    assert_eq!(response.status(), StatusCode::OK);

    let info: FileEntry = response.json().await.unwrap();
    assert_eq!(info.id, entry.id);
    assert_eq!(info.name, "song.mp3");
    assert_eq!(info.kind, EntryKind::Audio);
    assert_eq!(info.size, 3);
}
