// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Page data serialization and deserialization.
//!
//! This module handles exporting and importing page documents in YAML
//! and JSON formats, and ingesting bubble detection results produced by
//! an external detector. Boxes stay on the 0..1000 normalized scale in
//! every format so geometry remains resolution-independent.

use crate::models::bubble::{Bubble, BubbleShape, BubbleType, NormBox};
use crate::models::page::PageData;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A bubble record as an external detection/translation collaborator
/// produces it: no id, no styling, just text, box and type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub translated_text: String,
    #[serde(rename = "box")]
    pub bounds: NormBox,
    #[serde(rename = "type", default)]
    pub kind: Option<BubbleType>,
}

impl DetectionRecord {
    /// Promote a detection record into an editable bubble.
    ///
    /// Captions get rectangular fills, dialogue gets ellipses; colors are
    /// left at their defaults for the caller to sample.
    pub fn into_bubble(self, id: u64) -> Bubble {
        let kind = self.kind.unwrap_or(BubbleType::Dialogue);
        let shape = match kind {
            BubbleType::Caption => BubbleShape::Rectangle,
            BubbleType::Dialogue => BubbleShape::Ellipse,
        };
        let mut bubble = Bubble::new(id, self.bounds, shape);
        bubble.kind = kind;
        bubble.original_text = self.original_text;
        bubble.translated_text = self.translated_text;
        bubble
    }
}

/// Export page data to YAML format.
pub fn export_yaml(data: &PageData, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(data)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Export page data to JSON format.
pub fn export_json(data: &PageData, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Import page data from YAML format.
pub fn import_yaml(path: &Path) -> Result<PageData> {
    let yaml = std::fs::read_to_string(path)?;
    let data = serde_yaml::from_str(&yaml)?;
    Ok(data)
}

/// Import page data from JSON format.
pub fn import_json(path: &Path) -> Result<PageData> {
    let json = std::fs::read_to_string(path)?;
    let data = serde_json::from_str(&json)?;
    Ok(data)
}

/// Import a detection result set (JSON array of records).
pub fn import_detections(path: &Path) -> Result<Vec<DetectionRecord>> {
    let json = std::fs::read_to_string(path)?;
    let records = serde_json::from_str(&json)?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_records_parse_from_wire_json() {
        let json = r#"[
            {
                "originalText": "なに?!",
                "translatedText": "What?!",
                "box": { "xmin": 120, "ymin": 40, "xmax": 310, "ymax": 180 },
                "type": "dialogue"
            },
            {
                "translatedText": "Meanwhile...",
                "box": { "xmin": 20, "ymin": 20, "xmax": 200, "ymax": 80 },
                "type": "caption"
            }
        ]"#;
        let records: Vec<DetectionRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].bounds.xmax, 310.0);
        assert_eq!(records[0].original_text, "なに?!");
        assert_eq!(records[1].kind, Some(BubbleType::Caption));
    }

    #[test]
    fn test_detection_kind_drives_default_shape() {
        let dialogue = DetectionRecord {
            original_text: String::new(),
            translated_text: "Hi".into(),
            bounds: NormBox::new(0.0, 0.0, 100.0, 100.0),
            kind: None,
        };
        assert_eq!(dialogue.into_bubble(1).shape, BubbleShape::Ellipse);

        let caption = DetectionRecord {
            original_text: String::new(),
            translated_text: "Later...".into(),
            bounds: NormBox::new(0.0, 0.0, 100.0, 100.0),
            kind: Some(BubbleType::Caption),
        };
        let bubble = caption.into_bubble(2);
        assert_eq!(bubble.shape, BubbleShape::Rectangle);
        assert_eq!(bubble.kind, BubbleType::Caption);
    }

    #[test]
    fn test_page_round_trips_through_json_and_yaml() {
        let mut page = PageData::new("page_007.png".into(), 1600, 2400);
        let mut bubble = Bubble::new(3, NormBox::new(100.0, 100.0, 400.0, 260.0), BubbleShape::Ellipse);
        bubble.translated_text = "It round-trips!".into();
        page.bubbles.push(bubble);

        let json = serde_json::to_string(&page).unwrap();
        let from_json: PageData = serde_json::from_str(&json).unwrap();
        assert_eq!(from_json.bubbles, page.bubbles);
        assert_eq!(from_json.media_file, page.media_file);

        let yaml = serde_yaml::to_string(&page).unwrap();
        let from_yaml: PageData = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(from_yaml.bubbles, page.bubbles);
        assert_eq!(from_yaml.width, 1600);
    }
}
