//! End-to-end tests for `POST /api/upload` with a scripted model invoker.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use futures_util::stream::{self, StreamExt};
use gemini_relay::error::RelayError;
use gemini_relay::gateway::{router, AppState};
use gemini_relay::providers::{FragmentStream, StreamInvoker};
use http_body_util::BodyExt;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const BOUNDARY: &str = "relay-test-boundary";

enum Script {
    Fragments(Vec<&'static str>),
    FailBeforeStream,
    FailMidStream(Vec<&'static str>),
}

struct ScriptedInvoker {
    script: Script,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedInvoker {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamInvoker for ScriptedInvoker {
    async fn invoke(&self, prompt: &str) -> Result<FragmentStream, RelayError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.script {
            Script::FailBeforeStream => Err(RelayError::UpstreamInvocationFailure(
                "scripted failure".to_string(),
            )),
            Script::Fragments(fragments) => {
                let items: Vec<Result<String, RelayError>> =
                    fragments.iter().map(|f| Ok(f.to_string())).collect();
                Ok(stream::iter(items).boxed())
            }
            Script::FailMidStream(fragments) => {
                let mut items: Vec<Result<String, RelayError>> =
                    fragments.iter().map(|f| Ok(f.to_string())).collect();
                items.push(Err(RelayError::UpstreamInvocationFailure(
                    "scripted mid-stream failure".to_string(),
                )));
                Ok(stream::iter(items).boxed())
            }
        }
    }
}

struct Harness {
    invoker: Arc<ScriptedInvoker>,
    spool_dir: tempfile::TempDir,
    app: axum::Router,
}

fn harness(script: Script) -> Harness {
    let invoker = ScriptedInvoker::new(script);
    let spool_dir = tempfile::tempdir().unwrap();
    let app = router(AppState {
        invoker: invoker.clone(),
        spool_dir: spool_dir.path().to_path_buf(),
    });
    Harness {
        invoker,
        spool_dir,
        app,
    }
}

fn text_field(name: &str, value: &str) -> Vec<u8> {
    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}").into_bytes()
}

fn file_field(filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut field = format!(
        "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    field.extend_from_slice(data);
    field
}

fn form(fields: Vec<Vec<u8>>) -> Vec<u8> {
    let mut body = Vec::new();
    for field in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(&field);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn message_only_streams_framed_fragments() {
    let h = harness(Script::Fragments(vec!["Hel", "lo"]));
    let request = upload_request(form(vec![text_field("message", "say hello")]));
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-cache"
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"data: Hel\n\ndata: lo\n\n");
    assert_eq!(h.invoker.prompts(), vec!["say hello".to_string()]);
}

#[tokio::test]
async fn missing_both_fields_is_rejected_without_invocation() {
    let h = harness(Script::Fragments(vec!["never"]));
    let response = h.app.oneshot(upload_request(form(vec![]))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "No message or file provided");
    assert!(h.invoker.prompts().is_empty());
}

#[tokio::test]
async fn blank_fields_are_rejected_too() {
    let h = harness(Script::Fragments(vec!["never"]));
    let request = upload_request(form(vec![text_field("message", "")]));
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "No message or file provided");
    assert!(h.invoker.prompts().is_empty());
}

#[tokio::test]
async fn oversized_file_is_rejected_before_extraction() {
    let h = harness(Script::Fragments(vec!["never"]));
    let big = vec![b'a'; 4 * 1024 * 1024 + 1];
    let request = upload_request(form(vec![file_field("big.txt", "text/plain", &big)]));
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "File size exceeds the 4MB limit.");
    assert!(h.invoker.prompts().is_empty());
}

#[tokio::test]
async fn unsupported_type_is_rejected_with_no_spool_file() {
    let h = harness(Script::Fragments(vec!["never"]));
    let request = upload_request(form(vec![file_field("cat.png", "image/png", b"\x89PNG")]));
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Only text and PDF files are supported.");
    assert!(h.invoker.prompts().is_empty());

    let leftovers: Vec<_> = std::fs::read_dir(h.spool_dir.path())
        .map(|it| it.collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "spool file persisted after rejection");
}

#[tokio::test]
async fn message_and_text_file_combine_with_marker() {
    let h = harness(Script::Fragments(vec!["ok"]));
    let request = upload_request(form(vec![
        text_field("message", "summarize this"),
        file_field("invoice.txt", "text/plain", b"Invoice #42"),
    ]));
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        h.invoker.prompts(),
        vec!["summarize this\n\nFile Content:\nInvoice #42".to_string()]
    );
}

#[tokio::test]
async fn file_only_prompt_is_the_extracted_text_verbatim() {
    let h = harness(Script::Fragments(vec!["ok"]));
    let request = upload_request(form(vec![file_field(
        "invoice.txt",
        "text/plain",
        b"Invoice #42",
    )]));
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.invoker.prompts(), vec!["Invoice #42".to_string()]);
}

/// A one-page PDF showing `text` in Helvetica, with the xref built from
/// offsets recorded during assembly.
fn minimal_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_at = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    pdf.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets {
        pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    pdf
}

#[tokio::test]
async fn pdf_file_only_prompt_is_the_extracted_text() {
    let h = harness(Script::Fragments(vec!["ok"]));
    let pdf = minimal_pdf("Invoice #42");
    let request = upload_request(form(vec![file_field(
        "invoice.pdf",
        "application/pdf",
        &pdf,
    )]));
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let prompts = h.invoker.prompts();
    assert_eq!(prompts.len(), 1);
    // No prefix or suffix beyond what the PDF parser itself emits.
    assert_eq!(prompts[0].trim(), "Invoice #42");

    let leftovers: Vec<_> = std::fs::read_dir(h.spool_dir.path())
        .map(|it| it.collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "spool file persisted after success");
}

#[tokio::test]
async fn spool_is_cleaned_up_after_success() {
    let h = harness(Script::Fragments(vec!["ok"]));
    let request = upload_request(form(vec![file_field(
        "notes.txt",
        "text/plain",
        b"some notes",
    )]));
    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    // Drain the stream so the request is fully finished.
    let _ = response.into_body().collect().await.unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(h.spool_dir.path())
        .map(|it| it.collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "spool file persisted after success");
}

#[tokio::test]
async fn spool_is_cleaned_up_after_extraction_failure() {
    let h = harness(Script::Fragments(vec!["never"]));
    let request = upload_request(form(vec![file_field(
        "broken.pdf",
        "application/pdf",
        b"not a real pdf",
    )]));
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Failed to process the request.");

    let leftovers: Vec<_> = std::fs::read_dir(h.spool_dir.path())
        .map(|it| it.collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "spool file persisted after failure");
}

#[tokio::test]
async fn invocation_failure_before_streaming_is_a_json_500() {
    let h = harness(Script::FailBeforeStream);
    let request = upload_request(form(vec![text_field("message", "hello")]));
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Failed to process the request.");
}

#[tokio::test]
async fn mid_stream_failure_ends_the_body_abruptly() {
    let h = harness(Script::FailMidStream(vec!["partial"]));
    let request = upload_request(form(vec![text_field("message", "hello")]));
    let response = h.app.oneshot(request).await.unwrap();

    // Status and headers were committed before the failure.
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
    // The body errors out instead of delivering a structured error frame.
    assert!(response.into_body().collect().await.is_err());
}

#[tokio::test]
async fn unknown_fields_are_ignored() {
    let h = harness(Script::Fragments(vec!["ok"]));
    let request = upload_request(form(vec![
        text_field("csrf_token", "abc123"),
        text_field("message", "hello"),
    ]));
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.invoker.prompts(), vec!["hello".to_string()]);
}
