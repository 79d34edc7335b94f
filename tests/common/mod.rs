#![allow(dead_code)]

//! Shared helpers: in-memory test images and a stand-in vision service.

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::to_bytes,
    extract::Request,
    http::{header, StatusCode},
    Router,
};
use image::{ImageOutputFormat, Rgb, RgbImage};

pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageOutputFormat::Png).unwrap();
    buffer.into_inner()
}

pub fn jpeg_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageOutputFormat::Jpeg(90)).unwrap();
    buffer.into_inner()
}

/// Response body for a 100x100 image with one cat and one person.
pub const CAT_RESPONSE: &str = r#"{
    "modelVersion": "2023-10-01",
    "captionResult": { "text": "a cat", "confidence": 0.87 },
    "denseCaptionsResult": { "values": [
        { "text": "a cat", "confidence": 0.87, "boundingBox": { "x": 0, "y": 0, "w": 100, "h": 100 } },
        { "text": "a person in the background", "confidence": 0.52, "boundingBox": { "x": 70, "y": 5, "w": 20, "h": 60 } }
    ] },
    "tagsResult": { "values": [
        { "name": "cat", "confidence": 0.99 },
        { "name": "indoor", "confidence": 0.9 }
    ] },
    "objectsResult": { "values": [
        { "boundingBox": { "x": 10, "y": 10, "w": 50, "h": 40 }, "tags": [ { "name": "cat", "confidence": 0.91 } ] }
    ] },
    "peopleResult": { "values": [
        { "boundingBox": { "x": 70, "y": 5, "w": 20, "h": 60 }, "confidence": 0.8 }
    ] },
    "metadata": { "width": 100, "height": 100 }
}"#;

pub const UNAUTHORIZED_RESPONSE: &str = r#"{
    "error": {
        "code": "401",
        "message": "Access denied due to invalid subscription key or wrong API endpoint."
    }
}"#;

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub key: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

pub struct MockVision {
    pub url: String,
    pub requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockVision {
    pub fn captured(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

pub async fn spawn_vision_service(status: StatusCode, body: &str) -> MockVision {
    spawn_vision_service_with_delay(status, body, Duration::ZERO).await
}

/// Answers every request with `status` and `body` after `delay`, recording what it saw.
pub async fn spawn_vision_service_with_delay(
    status: StatusCode,
    body: &str,
    delay: Duration,
) -> MockVision {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let captured = requests.clone();
    let body = body.to_string();

    let app = Router::new().fallback(move |req: Request| {
        let captured = captured.clone();
        let body = body.clone();
        async move {
            let (parts, incoming) = req.into_parts();
            let bytes = to_bytes(incoming, usize::MAX).await.unwrap();
            let header_value = |name: &str| {
                parts
                    .headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            captured.lock().unwrap().push(CapturedRequest {
                method: parts.method.to_string(),
                path: parts.uri.path().to_string(),
                query: parts.uri.query().unwrap_or_default().to_string(),
                key: header_value("Ocp-Apim-Subscription-Key"),
                content_type: header_value("content-type"),
                body: bytes.to_vec(),
            });

            tokio::time::sleep(delay).await;
            (status, [(header::CONTENT_TYPE, "application/json")], body)
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockVision {
        url: format!("http://{}/", addr),
        requests,
    }
}

/// An address nothing is listening on.
pub async fn closed_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
