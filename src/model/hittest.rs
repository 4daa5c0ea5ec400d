//! Hit-testing (§4.6 "Hit testing"): turn a panel-coordinate point into the
//! button that should receive it.

use crate::model::button::Button;
use crate::model::manager::PageManager;
use crate::model::popup::Popup;

/// What a hit-test found, borrowed from the manager.
pub enum Hit<'a> {
    Popup { popup: &'a Popup, button: &'a Button },
    Page { button: &'a Button },
    None,
}

fn scan_buttons(buttons: &[Button], x: i32, y: i32) -> Option<&Button> {
    // "reverse button order" (top-most drawn last, so hit-test it first).
    buttons.iter().rev().find(|b| b.visible && b.enabled && b.geometry.contains(x, y))
}

/// Resolve `(x, y)` against the manager's currently-visible popups
/// (descending z-order) then the active page (§4.6). Visible popups that
/// belong to the active page are looked up through
/// [`PageManager::popup`]; hidden ones are never matched because only
/// `visible` popups are considered.
pub fn hit_test<'a>(manager: &'a PageManager, visible_popup_ids: &[i32], x: i32, y: i32) -> Hit<'a> {
    let mut candidates: Vec<&Popup> = visible_popup_ids
        .iter()
        .filter_map(|id| manager.popup(*id))
        .filter(|p| p.visible && p.geometry.contains(x, y))
        .collect();
    candidates.sort_by(|a, b| b.z_order.cmp(&a.z_order));

    for popup in candidates {
        if let Some(button) = scan_buttons(&popup.buttons, x - popup.geometry.x, y - popup.geometry.y) {
            return Hit::Popup { popup, button };
        }
        // A popup's rectangle claims the event even with no button hit
        // (modal and non-modal alike, per §4.6: "the first match wins
        // regardless of modality, since they're already above").
        return Hit::None;
    }

    if let Some(page) = manager.current_page() {
        if let Some(button) = scan_buttons(&page.buttons, x, y) {
            return Hit::Page { button };
        }
    }
    Hit::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::button::ButtonType;
    use crate::model::geometry::Rect;
    use crate::model::manager::{ProjectSource, Ref};
    use crate::model::page::Page;
    use crate::render::test_support::RecordingSurface;

    struct Src;
    impl ProjectSource for Src {
        fn load_page(&self, _id: i32) -> Option<Page> {
            None
        }
        fn load_page_by_name(&self, name: &str) -> Option<Page> {
            if name != "home" {
                return None;
            }
            let mut page = Page::new(1, "home", 1920, 1080);
            let mut btn = Button::new(1, 0, "btn", ButtonType::General);
            btn.geometry = Rect::new(0, 0, 100, 100);
            page.buttons.push(btn);
            Some(page)
        }
        fn load_popup(&self, _id: i32) -> Option<Popup> {
            None
        }
        fn load_popup_by_name(&self, _name: &str) -> Option<Popup> {
            None
        }
    }

    #[test]
    fn page_button_is_hit_when_no_popup_covers_it() {
        let mut mgr = PageManager::new(Box::new(Src), crate::config::Generation::G5);
        let render = RecordingSurface::default();
        mgr.set_page(Ref::from("home"), false, &render);
        match hit_test(&mgr, &[], 10, 10) {
            Hit::Page { button } => assert_eq!(button.name, "btn"),
            _ => panic!("expected a page hit"),
        }
    }

    #[test]
    fn outside_every_rectangle_misses() {
        let mut mgr = PageManager::new(Box::new(Src), crate::config::Generation::G5);
        let render = RecordingSurface::default();
        mgr.set_page(Ref::from("home"), false, &render);
        assert!(matches!(hit_test(&mgr, &[], 5000, 5000), Hit::None));
    }
}
