//! Dashboard Layout Models
//!
//! Grid positions of dashboard components, persisted per user.

use serde::{Deserialize, Serialize};

/// One component placed on the dashboard grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    /// Grid item id, e.g. "metrics-0"
    pub i: String,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_w: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<i32>,
    #[serde(rename = "static", default)]
    pub is_static: bool,
    /// Component type: "metrics", "table", "image", "insights", "file_download"
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default)]
    pub instance_idx: u32,
}

impl LayoutItem {
    fn placed(component_type: &str, x: i32, y: i32, w: i32, h: i32, min: (i32, i32)) -> Self {
        Self {
            i: format!("{}-0", component_type),
            x,
            y,
            w,
            h,
            min_w: Some(min.0),
            min_h: Some(min.1),
            max_w: None,
            max_h: None,
            is_static: false,
            component_type: component_type.to_string(),
            instance_idx: 0,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.i.is_empty() {
            return Err("layout item id is required".to_string());
        }
        if self.w <= 0 || self.h <= 0 {
            return Err(format!("layout item '{}' must have positive size", self.i));
        }
        if self.x < 0 || self.y < 0 {
            return Err(format!("layout item '{}' has a negative position", self.i));
        }
        Ok(())
    }
}

/// The complete layout configuration of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfiguration {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub items: Vec<LayoutItem>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl LayoutConfiguration {
    /// Layout used when a user has nothing saved: all five component types.
    pub fn default_for(user_id: impl Into<String>) -> Self {
        Self {
            id: "default".to_string(),
            user_id: user_id.into(),
            is_locked: false,
            items: vec![
                LayoutItem::placed("metrics", 0, 0, 8, 4, (4, 2)),
                LayoutItem::placed("table", 0, 4, 16, 8, (8, 6)),
                LayoutItem::placed("image", 16, 0, 8, 6, (4, 4)),
                LayoutItem::placed("insights", 16, 6, 8, 6, (4, 4)),
                LayoutItem::placed("file_download", 0, 12, 24, 4, (8, 2)),
            ],
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.user_id.is_empty() {
            return Err("userId is required".to_string());
        }
        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }
}
