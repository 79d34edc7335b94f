//! Structured result of a remote image analysis.
//!
//! Field names follow the Image Analysis 4.0 JSON response. Each result
//! section is optional: the service omits the sections it was not asked
//! for, and an omitted section stays `None` here rather than becoming an
//! empty list. `Some(vec![])` means "requested, nothing detected".

use serde::{Deserialize, Serialize};

/// Axis-aligned box in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    #[serde(rename = "w")]
    pub width: u32,
    #[serde(rename = "h")]
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge, inclusive. Computed wide so oversized boxes never overflow.
    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Bottom edge, inclusive.
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseCaption {
    pub text: String,
    pub confidence: f64,
    #[serde(
        rename = "boundingBox",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub bounding_box: Option<BoundingBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub confidence: f64,
}

/// A detected object. The service may attach several candidate tags;
/// the first one is the label shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    #[serde(rename = "boundingBox")]
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl DetectedObject {
    pub fn primary_tag(&self) -> Option<&Tag> {
        self.tags.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedPerson {
    #[serde(rename = "boundingBox")]
    pub bounding_box: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(
        rename = "captionResult",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub caption: Option<Caption>,

    #[serde(
        rename = "denseCaptionsResult",
        default,
        with = "value_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub dense_captions: Option<Vec<DenseCaption>>,

    #[serde(
        rename = "tagsResult",
        default,
        with = "value_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub tags: Option<Vec<Tag>>,

    #[serde(
        rename = "objectsResult",
        default,
        with = "value_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub objects: Option<Vec<DetectedObject>>,

    #[serde(
        rename = "peopleResult",
        default,
        with = "value_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub people: Option<Vec<DetectedPerson>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,

    #[serde(
        rename = "modelVersion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub model_version: Option<String>,
}

impl AnalysisResult {
    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }
}

/// `{"values": [...]}` sections flattened to `Option<Vec<T>>`.
mod value_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    struct Values<T> {
        #[serde(default = "Vec::new")]
        values: Vec<T>,
    }

    #[derive(Serialize)]
    struct ValuesRef<'a, T> {
        values: &'a [T],
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let section = Option::<Values<T>>::deserialize(deserializer)?;
        Ok(section.map(|s| s.values))
    }

    pub fn serialize<S, T>(value: &Option<Vec<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(values) => ValuesRef { values }.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_RESPONSE: &str = r#"{
        "modelVersion": "2023-10-01",
        "captionResult": { "text": "a cat sitting on a couch", "confidence": 0.87 },
        "denseCaptionsResult": { "values": [
            { "text": "a cat sitting on a couch", "confidence": 0.87,
              "boundingBox": { "x": 0, "y": 0, "w": 100, "h": 100 } },
            { "text": "a grey cushion", "confidence": 0.61,
              "boundingBox": { "x": 5, "y": 60, "w": 30, "h": 20 } }
        ] },
        "tagsResult": { "values": [
            { "name": "cat", "confidence": 0.99 },
            { "name": "indoor", "confidence": 0.93 }
        ] },
        "objectsResult": { "values": [
            { "boundingBox": { "x": 10, "y": 10, "w": 50, "h": 40 },
              "tags": [ { "name": "cat", "confidence": 0.91 }, { "name": "animal", "confidence": 0.5 } ] }
        ] },
        "peopleResult": { "values": [] },
        "metadata": { "width": 100, "height": 100 }
    }"#;

    #[test]
    fn test_parse_full_response() {
        let result = AnalysisResult::from_json(FULL_RESPONSE).unwrap();

        assert_eq!(result.model_version.as_deref(), Some("2023-10-01"));
        assert_eq!(result.caption.as_ref().unwrap().text, "a cat sitting on a couch");
        assert_eq!(result.dense_captions.as_ref().unwrap().len(), 2);
        assert_eq!(
            result.dense_captions.as_ref().unwrap()[1].bounding_box,
            Some(BoundingBox::new(5, 60, 30, 20))
        );
        assert_eq!(result.tags.as_ref().unwrap()[1].name, "indoor");

        let objects = result.objects.as_ref().unwrap();
        assert_eq!(objects[0].bounding_box, BoundingBox::new(10, 10, 50, 40));
        assert_eq!(objects[0].primary_tag().unwrap().name, "cat");

        assert_eq!(result.people, Some(vec![]));
        assert_eq!(
            result.metadata,
            Some(ImageMetadata {
                width: 100,
                height: 100
            })
        );
    }

    #[test]
    fn test_absent_sections_stay_none() {
        let result = AnalysisResult::from_json(
            r#"{ "captionResult": { "text": "a dog", "confidence": 0.5 } }"#,
        )
        .unwrap();

        assert!(result.caption.is_some());
        assert!(result.dense_captions.is_none());
        assert!(result.tags.is_none());
        assert!(result.objects.is_none());
        assert!(result.people.is_none());
    }

    #[test]
    fn test_null_section_is_absent() {
        let result = AnalysisResult::from_json(r#"{ "objectsResult": null }"#).unwrap();
        assert!(result.objects.is_none());
    }

    #[test]
    fn test_object_without_tags() {
        let result = AnalysisResult::from_json(
            r#"{ "objectsResult": { "values": [ { "boundingBox": { "x": 1, "y": 2, "w": 3, "h": 4 } } ] } }"#,
        )
        .unwrap();

        let objects = result.objects.unwrap();
        assert_eq!(objects.len(), 1);
        assert!(objects[0].primary_tag().is_none());
    }

    #[test]
    fn test_serializes_back_to_wire_shape() {
        let result = AnalysisResult {
            objects: Some(vec![DetectedObject {
                bounding_box: BoundingBox::new(1, 2, 3, 4),
                tags: vec![],
            }]),
            ..Default::default()
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["objectsResult"]["values"][0]["boundingBox"]["w"], 3);
        assert!(json.get("peopleResult").is_none());
    }

    #[test]
    fn test_box_edges_do_not_overflow() {
        let b = BoundingBox::new(u32::MAX, 0, u32::MAX, 1);
        assert_eq!(b.right(), u32::MAX as u64 * 2);
        assert_eq!(b.bottom(), 1);
    }
}
