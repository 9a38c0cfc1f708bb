use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use thiserror::Error;

use crate::request::{CompositionRequest, CompositionResponse};

const UPLOAD_ENDPOINT: &str = "upload-image";
const COMPOSITE_ENDPOINT: &str = "adjust-image";
const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build http client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} responded with status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("unreadable response from {endpoint}: {source}")]
    InvalidResponse {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("upload of {file_name} returned an empty filename")]
    EmptyFilename { file_name: String },
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Where the compositor left its output, plus when it was requested so a
/// display can bypass stale caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocator {
    pub url: String,
    pub requested_at_ms: u64,
}

impl OutputLocator {
    pub fn new(url: impl Into<String>, requested_at_ms: u64) -> Self {
        Self {
            url: url.into(),
            requested_at_ms,
        }
    }

    pub fn display_url(&self, cache_bust: bool) -> String {
        if !cache_bust {
            return self.url.clone();
        }
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{separator}t={}", self.url, self.requested_at_ms)
    }
}

pub trait UploadTransport: Send + Sync {
    /// Stores a raw file and returns the server-side filename for it.
    fn upload(&self, file_name: &str, bytes: &[u8]) -> TransportResult<String>;
}

pub trait CompositingTransport: Send + Sync {
    fn composite(&self, request: &CompositionRequest) -> TransportResult<OutputLocator>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    filename: String,
}

/// Client for the compositing service's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> TransportResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Client { source: err })?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

impl UploadTransport for HttpTransport {
    fn upload(&self, file_name: &str, bytes: &[u8]) -> TransportResult<String> {
        let endpoint = self.endpoint(UPLOAD_ENDPOINT);
        let form = Form::new().part(
            UPLOAD_FIELD,
            Part::bytes(bytes.to_vec()).file_name(file_name.to_string()),
        );
        tracing::info!(%endpoint, file_name, size = bytes.len(), "uploading image");

        let response = self
            .client
            .post(&endpoint)
            .multipart(form)
            .send()
            .map_err(|err| TransportError::Request {
                endpoint: endpoint.clone(),
                source: err,
            })?;
        let response = ensure_success(&endpoint, response)?;
        let body: UploadResponse =
            response.json().map_err(|err| TransportError::InvalidResponse {
                endpoint: endpoint.clone(),
                source: err,
            })?;
        if body.filename.is_empty() {
            return Err(TransportError::EmptyFilename {
                file_name: file_name.to_string(),
            });
        }
        Ok(body.filename)
    }
}

impl CompositingTransport for HttpTransport {
    fn composite(&self, request: &CompositionRequest) -> TransportResult<OutputLocator> {
        let endpoint = self.endpoint(COMPOSITE_ENDPOINT);
        let requested_at_ms = unix_millis_now();
        tracing::info!(
            %endpoint,
            source = %request.source_image_filename,
            target = %request.target_image_filename,
            "submitting composition request"
        );

        let response = self
            .client
            .post(&endpoint)
            .json(request)
            .send()
            .map_err(|err| TransportError::Request {
                endpoint: endpoint.clone(),
                source: err,
            })?;
        let response = ensure_success(&endpoint, response)?;
        let body: CompositionResponse =
            response.json().map_err(|err| TransportError::InvalidResponse {
                endpoint: endpoint.clone(),
                source: err,
            })?;
        if let Some(message) = body.message.as_deref() {
            tracing::debug!(
                reply = message,
                crop_box = ?body.crop_box,
                placement_box = ?body.placement_box,
                "compositor replied"
            );
        }
        Ok(OutputLocator::new(
            join_url(&self.base_url, &body.output_image_path),
            requested_at_ms,
        ))
    }
}

fn ensure_success(endpoint: &str, response: Response) -> TransportResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(TransportError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn unix_millis_now() -> u64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ImageSize, Point, Rect};
    use crate::request::{build_request, RequestInputs};
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    struct RecordedRequest {
        head: String,
        body: Vec<u8>,
    }

    impl RecordedRequest {
        fn request_line(&self) -> &str {
            self.head.lines().next().unwrap_or_default()
        }

        fn body_text(&self) -> String {
            String::from_utf8_lossy(&self.body).into_owned()
        }
    }

    /// Accepts one connection on an ephemeral port, records the request and
    /// answers with `status` and a JSON `body`.
    fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<RecordedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("stub server should bind");
        let base_url = format!(
            "http://{}",
            listener.local_addr().expect("stub server should have an address")
        );
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("client should connect");
            let recorded = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream
                .write_all(response.as_bytes())
                .expect("stub response should be written");
            recorded
        });
        (base_url, handle)
    }

    fn read_request(stream: &mut impl Read) -> RecordedRequest {
        let mut buffer = Vec::new();
        let mut chunk = [0_u8; 4096];
        let header_end = loop {
            if let Some(pos) = find(&buffer, b"\r\n\r\n") {
                break pos + 4;
            }
            let read = stream.read(&mut chunk).expect("request should be readable");
            assert!(read > 0, "client closed before sending headers");
            buffer.extend_from_slice(&chunk[..read]);
        };
        let head = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
        let header = |name: &str| {
            head.lines().find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.trim()
                    .eq_ignore_ascii_case(name)
                    .then(|| value.trim().to_ascii_lowercase())
            })
        };
        let content_length = header("content-length").and_then(|value| value.parse::<usize>().ok());
        let chunked = header("transfer-encoding").is_some_and(|value| value.contains("chunked"));

        loop {
            let body = &buffer[header_end..];
            let complete = match content_length {
                Some(length) => body.len() >= length,
                None if chunked => body.ends_with(b"0\r\n\r\n"),
                None => true,
            };
            if complete {
                break;
            }
            let read = stream.read(&mut chunk).expect("body should be readable");
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);
        }
        RecordedRequest {
            head,
            body: buffer[header_end..].to_vec(),
        }
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack
            .windows(needle.len())
            .position(|window| window == needle)
    }

    fn transport(base_url: &str) -> HttpTransport {
        HttpTransport::new(base_url, Duration::from_secs(5)).expect("client should build")
    }

    fn sample_request() -> CompositionRequest {
        build_request(&RequestInputs {
            source_filename: "stored-source.png",
            target_filename: "stored-target.png",
            output_filename: "output.png",
            source_image: ImageSize::new(796, 452),
            target_image: ImageSize::new(452, 796),
            subject: Some(Rect::new(52.6, 49.4, 100.0, 100.0)),
            placement: Some(Point::new(10.5, 20.5)),
        })
        .expect("complete inputs should build")
    }

    #[test]
    fn upload_sends_file_field_and_returns_stored_name() {
        let (base_url, server) = serve_once("200 OK", r#"{"filename": "stored-a.png"}"#);
        let stored = transport(&base_url)
            .upload("a.png", b"fake png bytes")
            .expect("upload should succeed");
        assert_eq!(stored, "stored-a.png");

        let recorded = server.join().expect("stub server should finish");
        assert!(recorded.request_line().starts_with("POST /upload-image "));
        assert!(recorded.head.to_ascii_lowercase().contains("multipart/form-data"));
        let body = recorded.body_text();
        assert!(body.contains(r#"name="file""#), "{body}");
        assert!(body.contains(r#"filename="a.png""#), "{body}");
        assert!(body.contains("fake png bytes"), "{body}");
    }

    #[test]
    fn upload_rejects_empty_stored_name() {
        let (base_url, server) = serve_once("200 OK", r#"{"filename": ""}"#);
        let err = transport(&base_url)
            .upload("a.png", b"bytes")
            .expect_err("empty filename should fail");
        server.join().expect("stub server should finish");
        assert!(matches!(err, TransportError::EmptyFilename { ref file_name } if file_name == "a.png"));
    }

    #[test]
    fn composite_posts_camel_case_json_and_resolves_output_path() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"message": "Image adjusted successfully", "outputImagePath": "outputs/output.png"}"#,
        );
        let locator = transport(&base_url)
            .composite(&sample_request())
            .expect("composite should succeed");
        assert_eq!(locator.url, format!("{base_url}/outputs/output.png"));
        assert!(locator.requested_at_ms > 0);

        let recorded = server.join().expect("stub server should finish");
        assert!(recorded.request_line().starts_with("POST /adjust-image "));
        let body: serde_json::Value =
            serde_json::from_slice(&recorded.body).expect("body should be json");
        assert_eq!(body["sourceImageFilename"], "stored-source.png");
        assert_eq!(body["targetImageFilename"], "stored-target.png");
        assert_eq!(
            body["subjectBox"],
            serde_json::json!({ "x": 53, "y": 49, "width": 100, "height": 100 })
        );
        assert_eq!(body["placementPoint"], serde_json::json!({ "x": 11, "y": 21 }));
        assert_eq!(body["targetImage"], serde_json::json!({ "width": 452, "height": 796 }));
    }

    #[test]
    fn non_success_status_becomes_status_error() {
        let (base_url, server) =
            serve_once("500 Internal Server Error", r#"{"detail": "compositor exploded"}"#);
        let err = transport(&base_url)
            .composite(&sample_request())
            .expect_err("500 should fail");
        server.join().expect("stub server should finish");
        match err {
            TransportError::Status {
                endpoint,
                status,
                body,
            } => {
                assert_eq!(endpoint, format!("{base_url}/adjust-image"));
                assert_eq!(status, 500);
                assert!(body.contains("compositor exploded"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_body_is_an_invalid_response() {
        let (base_url, server) = serve_once("200 OK", r#"{"unexpected": true}"#);
        let err = transport(&base_url)
            .composite(&sample_request())
            .expect_err("missing outputImagePath should fail");
        server.join().expect("stub server should finish");
        assert!(matches!(err, TransportError::InvalidResponse { .. }));
    }

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(
            join_url("http://localhost:8000/", "/outputs/output.png"),
            "http://localhost:8000/outputs/output.png"
        );
        assert_eq!(
            join_url("http://localhost:8000", "adjust-image"),
            "http://localhost:8000/adjust-image"
        );
    }

    #[test]
    fn display_url_appends_timestamp_when_cache_busting() {
        let locator = OutputLocator::new("http://localhost:8000/outputs/output.png", 1234);
        assert_eq!(
            locator.display_url(true),
            "http://localhost:8000/outputs/output.png?t=1234"
        );
        assert_eq!(
            locator.display_url(false),
            "http://localhost:8000/outputs/output.png"
        );

        let with_query = OutputLocator::new("http://host/out.png?v=2", 9);
        assert_eq!(with_query.display_url(true), "http://host/out.png?v=2&t=9");
    }

    #[test]
    fn status_error_mentions_endpoint_and_code() {
        let err = TransportError::Status {
            endpoint: "http://localhost:8000/adjust-image".to_string(),
            status: 500,
            body: "{\"detail\":\"boom\"}".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("adjust-image"));
        assert!(message.contains("500"));
    }
}
