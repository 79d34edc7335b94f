use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::client::{VisionClient, VisualFeature};
use crate::error::AnalyzerError;
use crate::ingest::{self, UploadSlot};
use crate::render::{AnalysisReport, RenderOptions};

pub struct AppState {
    pub client: VisionClient,
    /// Held for a whole interaction, so uploads are handled one at a time.
    pub slot: Mutex<UploadSlot>,
    pub features: Vec<VisualFeature>,
    pub render: RenderOptions,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(client: VisionClient, slot: UploadSlot) -> Self {
        Self {
            client,
            slot: Mutex::new(slot),
            features: VisualFeature::ALL.to_vec(),
            render: RenderOptions::default(),
            max_upload_bytes: crate::config::DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnnotatedImageView {
    pub caption: String,
    pub data_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub caption: Option<String>,
    pub dense_captions: Vec<String>,
    pub tags: Vec<String>,
    pub tags_line: Option<String>,
    pub objects: Vec<String>,
    pub people_count: Option<usize>,
    pub annotated_images: Vec<AnnotatedImageView>,
    pub processing_time_ms: u64,
}

impl AnalysisResponse {
    fn from_report(report: AnalysisReport, processing_time_ms: u64) -> Result<Self, AnalyzerError> {
        let annotated_images = report
            .annotated_images
            .iter()
            .map(|annotated| {
                Ok(AnnotatedImageView {
                    caption: annotated.caption.to_string(),
                    data_url: annotated.to_data_url()?,
                })
            })
            .collect::<Result<Vec<_>, AnalyzerError>>()?;

        Ok(Self {
            caption: report.caption,
            dense_captions: report.dense_captions,
            tags: report.tags,
            tags_line: report.tags_line,
            objects: report.objects,
            people_count: report.people_count,
            annotated_images,
            processing_time_ms,
        })
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn multipart(err: MultipartError, limit: usize) -> Self {
        let status = err.status();
        let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
            format!("Upload exceeds {} bytes", limit)
        } else {
            err.body_text()
        };
        Self { status, message }
    }
}

impl From<AnalyzerError> for ApiError {
    fn from(err: AnalyzerError) -> Self {
        let status = match &err {
            AnalyzerError::Decode(_) | AnalyzerError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            AnalyzerError::RemoteService { .. } => StatusCode::BAD_GATEWAY,
            AnalyzerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AnalyzerError::Storage(_) | AnalyzerError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = if err.is_client_error() {
            format!("Unable to display the uploaded image: {}", err)
        } else {
            err.to_string()
        };
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/analyze", post(analyze_image))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

async fn read_upload(multipart: &mut Multipart, limit: usize) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::multipart(e, limit))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::multipart(e, limit))?
            .to_vec();
        return Ok(Upload { filename, bytes });
    }

    Err(ApiError::bad_request("Missing \"image\" file field"))
}

/// Decoding, drawing and PNG encoding run off the async workers.
async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, AnalyzerError> + Send + 'static,
    T: Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(task).await.map_err(|e| ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: format!("image task failed: {}", e),
    })?;
    Ok(outcome?)
}

async fn analyze_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let start = Instant::now();

    let upload = read_upload(&mut multipart, state.max_upload_bytes).await?;
    if !ingest::is_supported_extension(&upload.filename) {
        return Err(ApiError::bad_request(format!(
            "Unsupported file type {:?}; choose a jpg, jpeg or png image",
            upload.filename
        )));
    }

    let slot = state.slot.lock().await;
    let target = slot.clone();
    let bytes = upload.bytes;
    let ingested = run_blocking(move || ingest::ingest(&target, bytes)).await?;
    info!(
        "📸 Analyzing {} ({}x{}, {} bytes)",
        upload.filename,
        ingested.image.width(),
        ingested.image.height(),
        ingested.bytes.len()
    );

    let result = state
        .client
        .analyze(&ingested.bytes, &state.features)
        .await
        .map_err(|e| {
            warn!("Analysis failed: {}", e);
            e
        })?;

    let render = state.render;
    let mut response = run_blocking(move || {
        let report = AnalysisReport::build(&result, &ingested.image, render);
        AnalysisResponse::from_report(report, 0)
    })
    .await?;
    drop(slot);

    response.processing_time_ms = start.elapsed().as_millis() as u64;
    info!("✅ Analysis rendered in {}ms", response.processing_time_ms);

    Ok(Json(response))
}

async fn index() -> Html<&'static str> {
    Html(
        r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Azure AI Vision - Image Analysis</title>
    <style>
        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, sans-serif;
            background: #f4f6fb;
            min-height: 100vh;
            display: flex;
            justify-content: center;
            padding: 40px 20px;
        }

        .container {
            background: white;
            border-radius: 12px;
            box-shadow: 0 10px 30px rgba(0,0,0,0.12);
            max-width: 900px;
            width: 100%;
            padding: 40px;
        }

        h1 {
            color: #222;
            margin-bottom: 10px;
        }

        h2 {
            color: #333;
            margin: 30px 0 15px;
        }

        .subtitle {
            color: #666;
            margin-bottom: 25px;
        }

        figure {
            margin-top: 20px;
        }

        figure img {
            max-width: 100%;
            border-radius: 8px;
        }

        figcaption {
            color: #777;
            font-size: 0.9em;
            text-align: center;
            margin-top: 6px;
        }

        button {
            margin-top: 20px;
            background: #0078d4;
            color: white;
            border: none;
            border-radius: 6px;
            padding: 10px 22px;
            font-size: 1em;
            cursor: pointer;
        }

        button:disabled {
            background: #9bbbd8;
            cursor: default;
        }

        .section {
            margin-top: 15px;
            line-height: 1.6;
        }

        .section em {
            font-weight: 600;
        }

        .error {
            background: #fee;
            border: 2px solid #fcc;
            color: #c33;
            padding: 15px;
            border-radius: 8px;
            margin-top: 20px;
            display: none;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>Azure AI Vision - Image Analysis</h1>
        <p class="subtitle">Upload an image to analyze it using Azure AI Vision.</p>

        <label for="fileInput">Choose an image file</label><br>
        <input type="file" id="fileInput" accept=".jpg,.jpeg,.png">

        <figure id="preview" hidden>
            <img id="previewImage" alt="Uploaded Image">
            <figcaption>Uploaded Image</figcaption>
        </figure>

        <button id="analyzeButton" disabled>Analyze Image</button>

        <div class="error" id="error"></div>
        <div id="results"></div>
    </div>

    <script>
        const fileInput = document.getElementById('fileInput');
        const preview = document.getElementById('preview');
        const previewImage = document.getElementById('previewImage');
        const analyzeButton = document.getElementById('analyzeButton');
        const errorDiv = document.getElementById('error');
        const results = document.getElementById('results');

        fileInput.addEventListener('change', () => {
            const file = fileInput.files[0];
            results.innerHTML = '';
            errorDiv.style.display = 'none';
            if (!file) {
                preview.hidden = true;
                analyzeButton.disabled = true;
                return;
            }
            const reader = new FileReader();
            reader.onload = (e) => { previewImage.src = e.target.result; };
            reader.readAsDataURL(file);
            preview.hidden = false;
            analyzeButton.disabled = false;
        });

        function section(label, body) {
            const div = document.createElement('div');
            div.className = 'section';
            const em = document.createElement('em');
            em.textContent = label;
            div.appendChild(em);
            div.appendChild(body);
            results.appendChild(div);
        }

        function text(value) {
            const span = document.createElement('span');
            span.textContent = ' ' + value;
            return span;
        }

        function list(items) {
            const ul = document.createElement('ul');
            for (const item of items) {
                const li = document.createElement('li');
                li.textContent = item;
                ul.appendChild(li);
            }
            return ul;
        }

        function figure(annotated) {
            const fig = document.createElement('figure');
            const img = document.createElement('img');
            img.src = annotated.data_url;
            img.alt = annotated.caption;
            const cap = document.createElement('figcaption');
            cap.textContent = annotated.caption;
            fig.appendChild(img);
            fig.appendChild(cap);
            return fig;
        }

        function render(result) {
            const heading = document.createElement('h2');
            heading.textContent = 'Analysis Results';
            results.appendChild(heading);

            if (result.caption !== null) {
                section('Caption:', text(result.caption));
            }
            if (result.dense_captions.length > 0) {
                section('Dense Captions:', list(result.dense_captions));
            }
            if (result.tags_line !== null) {
                section('Tags:', text(result.tags_line));
            }
            const objects = result.annotated_images.find(a => a.caption.endsWith('Objects'));
            if (objects) {
                section('Objects in Image:', list(result.objects));
                results.appendChild(figure(objects));
            }
            const people = result.annotated_images.find(a => a.caption.endsWith('People'));
            if (people) {
                section('People in Image:', text(result.people_count + ' detected'));
                results.appendChild(figure(people));
            }
        }

        analyzeButton.addEventListener('click', async () => {
            const file = fileInput.files[0];
            if (!file) {
                return;
            }

            analyzeButton.disabled = true;
            analyzeButton.textContent = 'Analyzing...';
            errorDiv.style.display = 'none';
            results.innerHTML = '';

            const formData = new FormData();
            formData.append('image', file);

            try {
                const response = await fetch('/analyze', {
                    method: 'POST',
                    body: formData
                });
                const body = await response.json();
                if (!response.ok) {
                    throw new Error(body.error || 'Analysis failed');
                }
                render(body);
            } catch (error) {
                errorDiv.textContent = error.message;
                errorDiv.style.display = 'block';
            } finally {
                analyzeButton.disabled = false;
                analyzeButton.textContent = 'Analyze Image';
            }
        });
    </script>
</body>
</html>
        "#,
    )
}
