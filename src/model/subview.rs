//! Subview lists (§3 "PageList / SubpageList / SubviewList", §4.6 "Subview
//! lists"): the scrollable sequence of subpages a `subpage_view` button
//! renders.

/// One entry in a subview list: its position and the page it shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubviewItem {
    pub index: u32,
    pub page_id: i32,
}

#[derive(Debug, Clone)]
pub struct SubviewList {
    pub id: i32,
    pub items: Vec<SubviewItem>,
}

/// Per-button navigation state: which item is first visible inside the
/// button's clipping rectangle.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubviewCursor {
    pub position: u32,
}

impl SubviewList {
    /// Items visible starting at `cursor`, clipped to at most `capacity`
    /// entries (§4.6: "items that exceed the rectangle are clipped").
    pub fn visible_items(&self, cursor: SubviewCursor, capacity: usize) -> &[SubviewItem] {
        let start = self
            .items
            .iter()
            .position(|it| it.index >= cursor.position)
            .unwrap_or(self.items.len());
        let end = (start + capacity).min(self.items.len());
        &self.items[start..end]
    }
}

impl SubviewCursor {
    pub fn advance(&mut self, by: u32, list: &SubviewList) {
        let max = list.items.last().map(|it| it.index).unwrap_or(0);
        self.position = (self.position + by).min(max);
    }

    pub fn retreat(&mut self, by: u32) {
        self.position = self.position.saturating_sub(by);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> SubviewList {
        SubviewList {
            id: 1,
            items: (0..10).map(|i| SubviewItem { index: i, page_id: 100 + i as i32 }).collect(),
        }
    }

    #[test]
    fn visible_items_are_clipped_to_capacity() {
        let l = list();
        let visible = l.visible_items(SubviewCursor::default(), 3);
        assert_eq!(visible.len(), 3);
        assert_eq!(visible[0].index, 0);
    }

    #[test]
    fn advance_moves_the_window() {
        let l = list();
        let mut cursor = SubviewCursor::default();
        cursor.advance(4, &l);
        let visible = l.visible_items(cursor, 3);
        assert_eq!(visible[0].index, 4);
    }
}
