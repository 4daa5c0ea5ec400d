//! Popups (subpages) (§3 "Popup (subpage)", §4.6).

use crate::model::animation::AnimSpec;
use crate::model::button::Button;
use crate::model::geometry::Rect;
use crate::model::sr::Sr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupType {
    Subpage,
    Subview,
}

/// Sentinel z-order for a popup that is not currently visible (§3: "
/// invisible popups have z-order = -1").
pub const HIDDEN_Z: i32 = -1;

#[derive(Debug, Clone)]
pub struct Popup {
    pub id: i32,
    pub name: String,
    pub geometry: Rect,
    pub group: Option<String>,
    pub modal: bool,
    pub popup_type: PopupType,
    pub timeout_ds: u32,
    pub show_effect: AnimSpec,
    pub hide_effect: AnimSpec,
    pub background_sr: Sr,
    pub buttons: Vec<Button>,
    pub z_order: i32,
    pub visible: bool,
}

impl Popup {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Popup {
            id,
            name: name.into(),
            geometry: Rect::default(),
            group: None,
            modal: false,
            popup_type: PopupType::Subpage,
            timeout_ds: 0,
            show_effect: AnimSpec::INSTANT,
            hide_effect: AnimSpec::INSTANT,
            background_sr: Sr::default(),
            buttons: Vec::new(),
            z_order: HIDDEN_Z,
            visible: false,
        }
    }
}
