//! Upload an image, send it to Azure AI Vision, and render the returned
//! caption, dense captions, tags, objects and people as text and
//! annotated image copies.

pub mod analysis;
pub mod client;
pub mod config;
pub mod error;
pub mod ingest;
pub mod render;
pub mod server;

pub use analysis::{
    AnalysisResult, BoundingBox, Caption, DenseCaption, DetectedObject, DetectedPerson,
    ImageMetadata, Tag,
};
pub use client::{ClientConfig, VisionClient, VisualFeature};
pub use config::{AppConfig, ConfigError};
pub use error::{AnalyzerError, Result};
pub use ingest::{ingest, IngestedImage, UploadSlot};
pub use render::{AnalysisReport, AnnotatedImage, BoxPolicy, RenderOptions};
