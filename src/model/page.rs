//! Pages (§3 "Page"): exactly one is active at any time.

use crate::model::button::Button;
use crate::model::sr::Sr;

#[derive(Debug, Clone)]
pub struct Page {
    pub id: i32,
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub background_sr: Sr,
    pub buttons: Vec<Button>,
    pub z_order: i32,
}

impl Page {
    pub fn new(id: i32, name: impl Into<String>, width: i32, height: i32) -> Self {
        Page {
            id,
            name: name.into(),
            width,
            height,
            background_sr: Sr::default(),
            buttons: Vec::new(),
            z_order: 0,
        }
    }

    /// Pages at or above the configured threshold are setup pages (§3,
    /// conventionally id >= 5000).
    pub fn is_setup_page(&self, threshold: i32) -> bool {
        self.id >= threshold
    }
}
