#![cfg(not(target_arch = "wasm32"))]

use axum::Router;
use axum::extract::{Multipart, State};
use axum::http::{StatusCode, Uri};
use axum::routing::post;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracker::download::DirectorySink;
use tracker::error::{
    BAD_REQUEST_MESSAGE, MISSING_FILES_MESSAGE, NOT_FOUND_MESSAGE, SERVER_ERROR_MESSAGE,
    TRANSPORT_MESSAGE,
};
use tracker::selection::SelectedFile;
use tracker::transport::HttpTransport;
use tracker::workflow::{FormKind, SubmitOutcome, WorkflowController, WorkflowStatus};

#[derive(Clone, Debug, PartialEq)]
struct SeenField {
    name: String,
    file_name: Option<String>,
    contents: Vec<u8>,
}

#[derive(Clone)]
struct MockService {
    status: StatusCode,
    body: &'static [u8],
    seen: Arc<Mutex<Vec<(String, Vec<SeenField>)>>>,
}

async fn process(
    State(mock): State<MockService>,
    uri: Uri,
    mut multipart: Multipart,
) -> (StatusCode, Vec<u8>) {
    let mut fields = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let contents = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        fields.push(SeenField {
            name,
            file_name,
            contents,
        });
    }
    mock.seen
        .lock()
        .unwrap()
        .push((uri.path().to_string(), fields));
    (mock.status, mock.body.to_vec())
}

/// Start a processing service stand-in answering every request with `status` and `body`.
async fn spawn_service(status: StatusCode, body: &'static [u8]) -> (String, MockService) {
    let mock = MockService {
        status,
        body,
        seen: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/process_latest", post(process))
        .route("/process_backlog", post(process))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/", addr), mock)
}

fn file(name: &str, contents: &[u8]) -> SelectedFile {
    SelectedFile::new(name, contents.to_vec())
}

fn latest_form() -> WorkflowController {
    let mut form = WorkflowController::new(FormKind::Latest);
    form.selection_mut()
        .add_inputs([file("daily.xlsx", b"daily")]);
    form.selection_mut()
        .add_tracker([file("tracker.xlsx", b"tracker")]);
    form
}

#[tokio::test]
async fn latest_success_downloads_processed_tracker() {
    let (base, mock) = spawn_service(StatusCode::OK, b"processed").await;
    let dir = tempfile::tempdir().unwrap();
    let mut sink = DirectorySink::new(dir.path());
    let mut form = latest_form();

    let outcome = form.submit(&HttpTransport::new(Some(base)), &mut sink).await;

    let SubmitOutcome::Saved(artifact) = outcome else {
        panic!("expected a saved artifact, got {:?}", outcome);
    };
    assert_eq!(artifact.file_name, "updated_latest_tracker.xlsx");
    let saved = std::fs::read(dir.path().join("updated_latest_tracker.xlsx")).unwrap();
    assert_eq!(saved, b"processed");
    assert_eq!(form.status(), WorkflowStatus::Idle);
    assert!(form.error().is_none());

    let seen = mock.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (path, fields) = &seen[0];
    assert_eq!(path, "/process_latest");
    assert_eq!(
        fields,
        &vec![
            SeenField {
                name: "input_file".to_string(),
                file_name: Some("daily.xlsx".to_string()),
                contents: b"daily".to_vec(),
            },
            SeenField {
                name: "tracker_file".to_string(),
                file_name: Some("tracker.xlsx".to_string()),
                contents: b"tracker".to_vec(),
            },
        ]
    );
}

#[tokio::test]
async fn backlog_sends_every_input_then_the_tracker() {
    let (base, mock) = spawn_service(StatusCode::OK, b"batch").await;
    let dir = tempfile::tempdir().unwrap();
    let mut sink = DirectorySink::new(dir.path());

    let mut form = WorkflowController::new(FormKind::Backlog);
    form.selection_mut().add_inputs([
        file("week-1.xlsx", b"1"),
        file("week-2.xlsx", b"2"),
        file("week-3.xls", b"3"),
    ]);
    form.selection_mut().remove_input(1);
    form.selection_mut()
        .add_tracker([file("tracker.xlsx", b"t")]);

    let outcome = form.submit(&HttpTransport::new(Some(base)), &mut sink).await;
    assert!(matches!(outcome, SubmitOutcome::Saved(_)));
    assert!(dir.path().join("processed_tracker.xlsx").exists());

    let seen = mock.seen.lock().unwrap();
    let (path, fields) = &seen[0];
    assert_eq!(path, "/process_backlog");
    let names: Vec<(&str, Option<&str>)> = fields
        .iter()
        .map(|f| (f.name.as_str(), f.file_name.as_deref()))
        .collect();
    assert_eq!(
        names,
        [
            ("input_files", Some("week-1.xlsx")),
            ("input_files", Some("week-3.xls")),
            ("tracker_file", Some("tracker.xlsx")),
        ]
    );
}

#[tokio::test]
async fn error_statuses_map_to_fixed_messages() {
    for (status, message) in [
        (StatusCode::BAD_REQUEST, BAD_REQUEST_MESSAGE),
        (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE),
        (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_MESSAGE),
    ] {
        let (base, _mock) = spawn_service(status, b"Traceback (most recent call last)").await;
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());
        let mut form = latest_form();

        let outcome = form.submit(&HttpTransport::new(Some(base)), &mut sink).await;

        assert_eq!(outcome, SubmitOutcome::Failed(message.into()));
        assert_eq!(form.error().map(|e| e.as_str()), Some(message));
        assert_eq!(form.status(), WorkflowStatus::Idle);
        assert_eq!(form.selection().inputs().len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

#[tokio::test]
async fn incomplete_selection_never_reaches_the_service() {
    let (base, mock) = spawn_service(StatusCode::OK, b"unused").await;
    let dir = tempfile::tempdir().unwrap();
    let mut sink = DirectorySink::new(dir.path());

    let mut form = WorkflowController::new(FormKind::Backlog);
    form.selection_mut()
        .add_tracker([file("tracker.xlsx", b"t")]);

    let outcome = form.submit(&HttpTransport::new(Some(base)), &mut sink).await;

    assert_eq!(outcome, SubmitOutcome::Failed(MISSING_FILES_MESSAGE.into()));
    assert!(mock.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_service_shows_generic_message() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let mut sink = DirectorySink::new(dir.path());
    let mut form = latest_form();
    let transport = HttpTransport::new(Some(format!("http://{}", addr)));

    let outcome = form.submit(&transport, &mut sink).await;

    assert_eq!(outcome, SubmitOutcome::Failed(TRANSPORT_MESSAGE.into()));
    assert_eq!(form.status(), WorkflowStatus::Idle);
}

#[tokio::test]
async fn missing_api_base_is_a_transport_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = DirectorySink::new(dir.path());
    let mut form = latest_form();

    let outcome = form.submit(&HttpTransport::new(None), &mut sink).await;

    assert_eq!(outcome, SubmitOutcome::Failed(TRANSPORT_MESSAGE.into()));
}

/// Read one request off `stream`: headers, then a `Content-Length` body or a chunked body.
async fn drain_request(stream: &mut tokio::net::TcpStream) {
    let mut seen = Vec::new();
    let mut buf = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        seen.extend_from_slice(&buf[..n]);
        if let Some(pos) = seen.windows(4).position(|w| w == &b"\r\n\r\n"[..]) {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&seen[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok());

    loop {
        let body = &seen[header_end..];
        let done = match content_length {
            Some(len) => body.len() >= len,
            None => body.ends_with(b"0\r\n\r\n"),
        };
        if done {
            return;
        }
        let n = stream.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        seen.extend_from_slice(&buf[..n]);
    }
}

#[tokio::test]
async fn truncated_success_body_is_a_transport_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        drain_request(&mut stream).await;
        let head = b"HTTP/1.1 200 OK\r\nContent-Length: 4096\r\nConnection: close\r\n\r\n";
        stream.write_all(head).await.unwrap();
        stream.write_all(b"PK\x03\x04").await.unwrap();
        stream.shutdown().await.unwrap();
    });

    let dir = tempfile::tempdir().unwrap();
    let mut sink = DirectorySink::new(dir.path());
    let mut form = latest_form();
    let transport = HttpTransport::new(Some(format!("http://{}", addr)));

    let outcome = form.submit(&transport, &mut sink).await;

    assert_eq!(outcome, SubmitOutcome::Failed(TRANSPORT_MESSAGE.into()));
    assert_eq!(form.error().map(|e| e.as_str()), Some(TRANSPORT_MESSAGE));
    assert_eq!(form.status(), WorkflowStatus::Idle);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
