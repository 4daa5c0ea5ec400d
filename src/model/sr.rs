//! State records (§3 "SR"): the per-state visual contract a button (or a
//! page/popup background) carries.

use crate::config::Generation;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BitmapRef {
    pub file: String,
    pub justification: u8,
    pub offset_x: i32,
    pub offset_y: i32,
}

/// One visual state. G4 panels set only `bm`; G5 panels push onto
/// `bitmap_list`. [`Sr::bitmap`] implements the stated precedence: "if the
/// bitmap list is non-empty it takes precedence."
#[derive(Debug, Clone, Default)]
pub struct Sr {
    pub number: u32,
    pub background_color: String,
    pub text_color: String,
    pub border_color: String,
    pub effect_color: String,
    pub border_style: String,
    pub border_width: i32,
    pub bitmap_list: Vec<BitmapRef>,
    /// G4's single-bitmap field.
    pub bm: Option<String>,
    pub mask_bitmap: Option<String>,
    pub font_index: i32,
    pub text: String,
    pub text_x: i32,
    pub text_y: i32,
    pub text_effect: String,
    pub text_orient: TextOrient,
    pub word_wrap: bool,
    pub icon_index: i32,
    pub opacity: u8,
    pub fill_top: i32,
    pub fill_left: i32,
    pub fill_bottom: i32,
    pub fill_right: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextOrient {
    #[default]
    Center,
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Sr {
    /// The bitmap to draw for this state, honoring the G4/G5 precedence
    /// rule (§3: bitmap list wins whenever non-empty, regardless of
    /// `generation`; `generation` only matters when the list is empty and
    /// `bm` is the sole source on a G4 panel).
    pub fn bitmap(&self, generation: Generation) -> Option<&str> {
        if let Some(top) = self.bitmap_list.last() {
            return Some(top.file.as_str());
        }
        match generation {
            Generation::G4 => self.bm.as_deref(),
            Generation::G5 => self.bm.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmap_list_takes_precedence_over_bm() {
        let mut sr = Sr::default();
        sr.bm = Some("single.png".into());
        sr.bitmap_list.push(BitmapRef {
            file: "stacked.png".into(),
            ..Default::default()
        });
        assert_eq!(sr.bitmap(Generation::G4), Some("stacked.png"));
        assert_eq!(sr.bitmap(Generation::G5), Some("stacked.png"));
    }

    #[test]
    fn falls_back_to_bm_when_list_empty() {
        let mut sr = Sr::default();
        sr.bm = Some("single.png".into());
        assert_eq!(sr.bitmap(Generation::G4), Some("single.png"));
    }
}
