//! Turns an [`AnalysisResult`] into display text and annotated images.
//!
//! Objects and people are drawn on separate copies of the source image so
//! either category can be shown or dropped without touching the other.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::analysis::{AnalysisResult, BoundingBox};
use crate::error::{AnalyzerError, Result};

pub const OBJECTS_COLOR: Rgba<u8> = Rgba([0, 255, 255, 255]);
pub const PEOPLE_COLOR: Rgba<u8> = Rgba([255, 255, 0, 255]);
pub const STROKE_WIDTH: u32 = 3;

pub const OBJECTS_CAPTION: &str = "Annotated Image with Detected Objects";
pub const PEOPLE_CAPTION: &str = "Annotated Image with Detected People";

/// How boxes reaching past the image edge are drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoxPolicy {
    /// Draw the box as reported; parts off the canvas are simply not visible.
    #[default]
    Permissive,
    /// Pull the corners onto the canvas first so every edge stays visible.
    Clamp,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub box_policy: BoxPolicy,
}

/// Confidence in [0, 1] as a percentage with two decimals.
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.2}", confidence * 100.0)
}

fn with_confidence(text: &str, confidence: f64) -> String {
    format!("{} (Confidence: {}%)", text, format_confidence(confidence))
}

pub fn render_caption(result: &AnalysisResult) -> Option<String> {
    result
        .caption
        .as_ref()
        .map(|caption| with_confidence(&caption.text, caption.confidence))
}

pub fn render_dense_captions(result: &AnalysisResult) -> Vec<String> {
    result
        .dense_captions
        .iter()
        .flatten()
        .map(|caption| with_confidence(&caption.text, caption.confidence))
        .collect()
}

pub fn render_tags(result: &AnalysisResult) -> Vec<String> {
    result
        .tags
        .iter()
        .flatten()
        .map(|tag| with_confidence(&tag.name, tag.confidence))
        .collect()
}

/// Tags as the single comma separated line the page shows.
pub fn render_tags_line(result: &AnalysisResult) -> Option<String> {
    result.tags.as_ref().map(|_| render_tags(result).join(", "))
}

/// One line per object, labelled with its first tag. Untagged objects are skipped.
pub fn render_objects(result: &AnalysisResult) -> Vec<String> {
    result
        .objects
        .iter()
        .flatten()
        .filter_map(|object| object.primary_tag())
        .map(|tag| with_confidence(&tag.name, tag.confidence))
        .collect()
}

/// A rectangle as it was requested on the canvas, inclusive corners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawnBox {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
    /// First tag of the detected object; people carry no label.
    pub label: Option<String>,
}

impl DrawnBox {
    fn from_corners(bbox: &BoundingBox) -> Self {
        Self {
            left: bbox.x as i64,
            top: bbox.y as i64,
            right: bbox.right() as i64,
            bottom: bbox.bottom() as i64,
            label: None,
        }
    }
}

/// Owned copy of the source image with one category of boxes drawn on it.
#[derive(Debug, Clone)]
pub struct AnnotatedImage {
    pub image: RgbaImage,
    pub caption: &'static str,
    pub boxes: Vec<DrawnBox>,
}

impl AnnotatedImage {
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.image
            .write_to(&mut buffer, ImageOutputFormat::Png)
            .map_err(|e| AnalyzerError::Encode(e.to_string()))?;
        Ok(buffer.into_inner())
    }

    pub fn to_data_url(&self) -> Result<String> {
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(self.to_png()?)))
    }
}

pub fn annotate_objects(
    image: &DynamicImage,
    result: &AnalysisResult,
    options: RenderOptions,
) -> Option<AnnotatedImage> {
    let objects = result.objects.as_ref()?;
    Some(annotate(
        image,
        objects
            .iter()
            .map(|o| (&o.bounding_box, o.primary_tag().map(|tag| tag.name.as_str()))),
        OBJECTS_COLOR,
        OBJECTS_CAPTION,
        options.box_policy,
    ))
}

pub fn annotate_people(
    image: &DynamicImage,
    result: &AnalysisResult,
    options: RenderOptions,
) -> Option<AnnotatedImage> {
    let people = result.people.as_ref()?;
    Some(annotate(
        image,
        people.iter().map(|p| (&p.bounding_box, None::<&str>)),
        PEOPLE_COLOR,
        PEOPLE_CAPTION,
        options.box_policy,
    ))
}

fn annotate<'a>(
    image: &DynamicImage,
    boxes: impl Iterator<Item = (&'a BoundingBox, Option<&'a str>)>,
    color: Rgba<u8>,
    caption: &'static str,
    policy: BoxPolicy,
) -> AnnotatedImage {
    let mut canvas = image.to_rgba8();
    let drawn = boxes
        .map(|(bbox, label)| {
            let mut drawn = match place(bbox, canvas.width(), canvas.height(), policy) {
                Some(placed) => {
                    draw_box(&mut canvas, &placed, color, STROKE_WIDTH);
                    placed
                }
                None => DrawnBox::from_corners(bbox),
            };
            drawn.label = label.map(str::to_string);
            drawn
        })
        .collect();

    AnnotatedImage {
        image: canvas,
        caption,
        boxes: drawn,
    }
}

/// Where `bbox` lands on the canvas, or `None` when clamping leaves nothing to draw.
fn place(bbox: &BoundingBox, width: u32, height: u32, policy: BoxPolicy) -> Option<DrawnBox> {
    let reported = DrawnBox::from_corners(bbox);

    match policy {
        BoxPolicy::Permissive => Some(reported),
        BoxPolicy::Clamp => {
            if width == 0 || height == 0 {
                return None;
            }
            let max_x = width as i64 - 1;
            let max_y = height as i64 - 1;
            // Entirely past the right or bottom edge: clamping would invent a box.
            if reported.left > max_x || reported.top > max_y {
                return None;
            }
            Some(DrawnBox {
                right: reported.right.min(max_x),
                bottom: reported.bottom.min(max_y),
                ..reported
            })
        }
    }
}

/// Outline `b` with a stroke of `stroke` pixels growing inward from its edge.
fn draw_box(canvas: &mut RgbaImage, b: &DrawnBox, color: Rgba<u8>, stroke: u32) {
    // Coordinates far off the canvas only cost line-walking time; pulling them
    // in to just past the edge leaves the visible pixels unchanged.
    let limit_x = canvas.width() as i64 + stroke as i64;
    let limit_y = canvas.height() as i64 + stroke as i64;
    let left = b.left.min(limit_x);
    let top = b.top.min(limit_y);
    let right = b.right.min(limit_x);
    let bottom = b.bottom.min(limit_y);

    for inset in 0..stroke as i64 {
        let width = right - left + 1 - 2 * inset;
        let height = bottom - top + 1 - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at((left + inset) as i32, (top + inset) as i32)
            .of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Every rendered section of one analysis.
#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    pub caption: Option<String>,
    pub dense_captions: Vec<String>,
    pub tags: Vec<String>,
    pub tags_line: Option<String>,
    pub objects: Vec<String>,
    pub people_count: Option<usize>,
    pub annotated_images: Vec<AnnotatedImage>,
}

impl AnalysisReport {
    pub fn build(result: &AnalysisResult, image: &DynamicImage, options: RenderOptions) -> Self {
        let annotated_images = [
            annotate_objects(image, result, options),
            annotate_people(image, result, options),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            caption: render_caption(result),
            dense_captions: render_dense_captions(result),
            tags: render_tags(result),
            tags_line: render_tags_line(result),
            objects: render_objects(result),
            people_count: result.people.as_ref().map(Vec::len),
            annotated_images,
        }
    }
}
