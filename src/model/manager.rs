//! The page/popup manager (§3 "Ownership & lifecycle", §4.6). A
//! process-wide singleton in the reference implementation; here an owned
//! value the embedder constructs once and passes around (§9 "Global
//! singletons map to injected references").

use std::collections::HashMap;

use crate::model::animation::AnimSpec;
use crate::model::button::Button;
use crate::model::page::Page;
use crate::model::popup::{Popup, HIDDEN_Z};
use crate::render::RenderSurface;

/// A [`ProjectSource`] with nothing loaded. Useful as a placeholder until
/// the embedder has a real project to parse, or in tests that never
/// reference a page/popup by id.
pub struct NullProjectSource;

impl ProjectSource for NullProjectSource {
    fn load_page(&self, _id: i32) -> Option<Page> {
        None
    }
    fn load_page_by_name(&self, _name: &str) -> Option<Page> {
        None
    }
    fn load_popup(&self, _id: i32) -> Option<Popup> {
        None
    }
    fn load_popup_by_name(&self, _name: &str) -> Option<Popup> {
        None
    }
}

/// Typed records the page manager asks for on first reference (§3 "Loaded
/// lazily on first reference and cached"). On-disk project parsing is
/// explicitly out of scope (§1); this trait is the parser-abstraction
/// boundary the spec calls for instead.
pub trait ProjectSource: Send + Sync {
    fn load_page(&self, id: i32) -> Option<Page>;
    fn load_page_by_name(&self, name: &str) -> Option<Page>;
    fn load_popup(&self, id: i32) -> Option<Popup>;
    fn load_popup_by_name(&self, name: &str) -> Option<Popup>;
}

/// Either end of a page/popup reference as it appears in a command string.
#[derive(Debug, Clone)]
pub enum Ref {
    Id(i32),
    Name(String),
}

impl From<&str> for Ref {
    fn from(s: &str) -> Self {
        Ref::Name(s.to_string())
    }
}

pub struct PageManager {
    source: Box<dyn ProjectSource>,
    generation: crate::config::Generation,
    pages: HashMap<i32, Page>,
    popups: HashMap<i32, Popup>,
    page_names: HashMap<String, i32>,
    popup_names: HashMap<String, i32>,
    current_page: Option<i32>,
    /// Per-page memory of which popups were visible the last time that
    /// page was active, so re-navigating restores them (§3).
    page_visible_popups: HashMap<i32, Vec<i32>>,
    /// Bumped on every show/hide of a popup; a scheduled timeout captures
    /// the epoch at show time and only fires if it still matches (P7).
    epochs: HashMap<i32, u64>,
}

impl PageManager {
    pub fn new(source: Box<dyn ProjectSource>, generation: crate::config::Generation) -> Self {
        PageManager {
            source,
            generation,
            pages: HashMap::new(),
            popups: HashMap::new(),
            page_names: HashMap::new(),
            popup_names: HashMap::new(),
            current_page: None,
            page_visible_popups: HashMap::new(),
            epochs: HashMap::new(),
        }
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.current_page.and_then(|id| self.pages.get(&id))
    }

    pub fn popup(&self, id: i32) -> Option<&Popup> {
        self.popups.get(&id)
    }

    fn resolve_page_id(&mut self, r: &Ref) -> Option<i32> {
        match r {
            Ref::Id(id) => {
                if !self.pages.contains_key(id) {
                    let page = self.source.load_page(*id)?;
                    self.page_names.insert(page.name.clone(), page.id);
                    self.pages.insert(page.id, page);
                }
                Some(*id)
            }
            Ref::Name(name) => {
                if let Some(id) = self.page_names.get(name) {
                    return Some(*id);
                }
                let page = self.source.load_page_by_name(name)?;
                let id = page.id;
                self.page_names.insert(page.name.clone(), id);
                self.pages.insert(id, page);
                Some(id)
            }
        }
    }

    fn resolve_popup_id(&mut self, r: &Ref) -> Option<i32> {
        match r {
            Ref::Id(id) => {
                if !self.popups.contains_key(id) {
                    let popup = self.source.load_popup(*id)?;
                    self.popup_names.insert(popup.name.clone(), popup.id);
                    self.popups.insert(popup.id, popup);
                }
                Some(*id)
            }
            Ref::Name(name) => {
                if let Some(id) = self.popup_names.get(name) {
                    return Some(*id);
                }
                let popup = self.source.load_popup_by_name(name)?;
                let id = popup.id;
                self.popup_names.insert(popup.name.clone(), id);
                self.popups.insert(id, popup);
                Some(id)
            }
        }
    }

    /// `set_page` (§4.6). `reset_pos` forces the target page's popups to
    /// revert to loaded defaults instead of being restored from memory.
    pub fn set_page(&mut self, target: Ref, reset_pos: bool, render: &dyn RenderSurface) -> bool {
        let Some(new_id) = self.resolve_page_id(&target) else {
            tracing::warn!(?target, "PAGE- referenced an unknown page; ignored");
            return false;
        };

        if let Some(old_id) = self.current_page {
            if old_id == new_id {
                return true;
            }
            let visible: Vec<i32> = self
                .page_visible_popups
                .get(&old_id)
                .into_iter()
                .flatten()
                .copied()
                .filter(|id| self.popups.get(id).map(|p| p.visible).unwrap_or(false))
                .collect();
            for popup_id in &visible {
                render.drop_subpage(*popup_id as u32, old_id as u32);
            }
            self.page_visible_popups.insert(old_id, visible);
            render.drop_page(old_id as u32);
        }

        self.current_page = Some(new_id);
        let page = &self.pages[&new_id];
        render.display_page(new_id as u32, page.width, page.height);

        if reset_pos {
            self.page_visible_popups.remove(&new_id);
        }

        let restore = self.page_visible_popups.get(&new_id).cloned().unwrap_or_default();
        for popup_id in restore {
            if let Some(popup) = self.popups.get(&popup_id) {
                if popup.visible {
                    render.set_subpage(
                        popup_id as u32,
                        new_id as u32,
                        popup.geometry.x,
                        popup.geometry.y,
                        popup.geometry.width,
                        popup.geometry.height,
                        AnimSpec::INSTANT,
                    );
                }
            }
        }
        true
    }

    /// Find the id of the popup currently visible on `target_page` that
    /// shares `group`, if any (§4.6 group-singleton policy). Only popups
    /// already recorded against `target_page` count: a popup left visible
    /// on a page the user has since navigated away from does not conflict
    /// with a different page's group.
    fn group_conflict(&self, target_page: i32, group: &str, except: i32) -> Option<i32> {
        self.page_visible_popups
            .get(&target_page)?
            .iter()
            .copied()
            .find(|id| {
                *id != except
                    && self.popups.get(id).map(|p| p.visible).unwrap_or(false)
                    && self.popups.get(id).and_then(|p| p.group.as_deref()) == Some(group)
            })
    }

    /// `show_popup` (§4.6 "Popup show"). Returns the timeout to schedule,
    /// if any: `(popup_id, timeout_ds, epoch)`.
    pub fn show_popup(&mut self, target: Ref, page: Option<Ref>, render: &dyn RenderSurface) -> Option<(i32, u32, u64)> {
        let popup_id = self.resolve_popup_id(&target)?;
        let target_page = match page {
            Some(p) => self.resolve_page_id(&p)?,
            None => self.current_page?,
        };

        if let Some(group) = self.popups.get(&popup_id).and_then(|p| p.group.clone()) {
            if let Some(conflict) = self.group_conflict(target_page, &group, popup_id) {
                self.hide_popup_by_id(conflict, render);
            }
        }

        let max_z = self
            .popups
            .values()
            .filter(|p| p.visible)
            .map(|p| p.z_order)
            .max()
            .unwrap_or(0);

        let (timeout_ds, geometry) = {
            let popup = self.popups.get_mut(&popup_id)?;
            popup.visible = true;
            popup.z_order = max_z + 1;
            (popup.timeout_ds, popup.geometry)
        };
        *self.epochs.entry(popup_id).or_insert(0) += 1;
        let epoch = self.epochs[&popup_id];

        self.page_visible_popups.entry(target_page).or_default().push(popup_id);
        if self.current_page == Some(target_page) {
            render.set_subpage(
                popup_id as u32,
                target_page as u32,
                geometry.x,
                geometry.y,
                geometry.width,
                geometry.height,
                AnimSpec::INSTANT,
            );
        }

        if timeout_ds > 0 {
            Some((popup_id, timeout_ds, epoch))
        } else {
            None
        }
    }

    fn hide_popup_by_id(&mut self, popup_id: i32, render: &dyn RenderSurface) {
        let Some(popup) = self.popups.get_mut(&popup_id) else { return };
        if !popup.visible {
            return;
        }
        popup.visible = false;
        popup.z_order = HIDDEN_Z;
        *self.epochs.entry(popup_id).or_insert(0) += 1;
        if let Some(page_id) = self.current_page {
            render.drop_subpage(popup_id as u32, page_id as u32);
        }
    }

    pub fn hide_popup(&mut self, target: Ref, render: &dyn RenderSurface) -> bool {
        let Some(id) = self.resolve_popup_id(&target) else {
            return false;
        };
        self.hide_popup_by_id(id, render);
        true
    }

    pub fn toggle_popup(&mut self, target: Ref, render: &dyn RenderSurface) -> Option<(i32, u32, u64)> {
        let id = self.resolve_popup_id(&target)?;
        if self.popups.get(&id).map(|p| p.visible).unwrap_or(false) {
            self.hide_popup_by_id(id, render);
            None
        } else {
            self.show_popup(Ref::Id(id), None, render)
        }
    }

    pub fn hide_group(&mut self, group: &str, render: &dyn RenderSurface) {
        let Some(page_id) = self.current_page else { return };
        let ids: Vec<i32> = self
            .page_visible_popups
            .get(&page_id)
            .into_iter()
            .flatten()
            .copied()
            .filter(|id| {
                self.popups
                    .get(id)
                    .map(|p| p.visible && p.group.as_deref() == Some(group))
                    .unwrap_or(false)
            })
            .collect();
        for id in ids {
            self.hide_popup_by_id(id, render);
        }
    }

    pub fn hide_all(&mut self, render: &dyn RenderSurface) {
        let Some(page_id) = self.current_page else { return };
        let ids: Vec<i32> = self
            .page_visible_popups
            .get(&page_id)
            .into_iter()
            .flatten()
            .copied()
            .filter(|id| self.popups.get(id).map(|p| p.visible).unwrap_or(false))
            .collect();
        for id in ids {
            self.hide_popup_by_id(id, render);
        }
    }

    /// Called by the scheduled timeout thread. Only hides if `epoch` still
    /// matches (P7: a prior hide bumps the epoch, cancelling this).
    pub fn fire_timeout(&mut self, popup_id: i32, epoch: u64, render: &dyn RenderSurface) {
        if self.epochs.get(&popup_id).copied().unwrap_or(0) == epoch {
            self.hide_popup_by_id(popup_id, render);
        }
    }

    pub fn current_epoch(&self, popup_id: i32) -> u64 {
        self.epochs.get(&popup_id).copied().unwrap_or(0)
    }

    /// Containers eligible for address-port button commands: the active
    /// page and any popups currently visible on it (§4.7).
    fn active_container_ids(&self) -> Vec<i32> {
        let Some(page_id) = self.current_page else {
            return Vec::new();
        };
        let mut ids = vec![page_id];
        ids.extend(self.page_visible_popups.get(&page_id).into_iter().flatten().copied().filter(|id| {
            self.popups.get(id).map(|p| p.visible).unwrap_or(false)
        }));
        ids
    }

    fn container_buttons_mut(&mut self, container_id: i32) -> Option<&mut Vec<Button>> {
        if let Some(page) = self.pages.get_mut(&container_id) {
            return Some(&mut page.buttons);
        }
        self.popups.get_mut(&container_id).map(|p| &mut p.buttons)
    }

    fn container_buttons(&self, container_id: i32) -> Option<&Vec<Button>> {
        if let Some(page) = self.pages.get(&container_id) {
            return Some(&page.buttons);
        }
        self.popups.get(&container_id).map(|p| &p.buttons)
    }

    /// The first button addressed by `port`/`channel` on the active page or
    /// one of its visible popups, for query commands (`?BCF`, ...).
    pub fn find_button(&self, port: u16, channel: u16) -> Option<&Button> {
        self.active_container_ids().into_iter().find_map(|container_id| {
            self.container_buttons(container_id)?
                .iter()
                .find(|b| b.address_port == port && b.address_channel == channel)
        })
    }

    /// The first button bound to `(port, channel)` for *feedback*, the pair
    /// `apply_channel_feedback` matches against — distinct from the
    /// `address_port`/`address_channel` pair `find_button` uses for
    /// command-string addressing (§4.3 `0x000f` status request).
    pub fn find_button_by_channel(&self, port: u16, channel: u16) -> Option<&Button> {
        self.active_container_ids()
            .into_iter()
            .find_map(|container_id| self.container_buttons(container_id)?.iter().find(|b| b.port == port && b.channel == channel))
    }

    /// The first button bound to `(port, channel)` for level feedback, the
    /// pair `apply_level_feedback` matches against (§4.3 `0x000e` value
    /// request).
    pub fn find_button_by_level(&self, port: u16, channel: u16) -> Option<&Button> {
        self.active_container_ids().into_iter().find_map(|container_id| {
            self.container_buttons(container_id)?
                .iter()
                .find(|b| b.level_port == port && b.level_channel == channel)
        })
    }

    /// `@PPT-<popup>,<deciseconds>`: update a popup's configured timeout
    /// without changing its visibility.
    pub fn set_popup_timeout(&mut self, target: Ref, deciseconds: u32) -> bool {
        let Some(id) = self.resolve_popup_id(&target) else {
            return false;
        };
        if let Some(popup) = self.popups.get_mut(&id) {
            popup.timeout_ds = deciseconds;
            true
        } else {
            false
        }
    }

    /// Apply controller-driven channel feedback (`0x0006`/`0x0007`) to
    /// every button bound to `(port, channel)`: state 2 while on, state 1
    /// while off (§4.7 two-state feedback convention).
    pub fn apply_channel_feedback(&mut self, port: u16, channel: u16, on: bool, render: &dyn RenderSurface) {
        for container_id in self.active_container_ids() {
            let Some(buttons) = self.container_buttons_mut(container_id) else {
                continue;
            };
            for button in buttons.iter_mut() {
                if button.port != port || button.channel != channel {
                    continue;
                }
                button.active_sr = if on { 2 } else { 1 };
                self.redraw_button(container_id, button, render);
            }
        }
    }

    /// Apply a controller-driven level change (`0x000a`) to every bargraph
    /// bound to `(port, channel)`.
    pub fn apply_level_feedback(&mut self, port: u16, channel: u16, value: i32, render: &dyn RenderSurface) {
        for container_id in self.active_container_ids() {
            let Some(buttons) = self.container_buttons_mut(container_id) else {
                continue;
            };
            for button in buttons.iter_mut() {
                if button.level_port != port || button.level_channel != channel {
                    continue;
                }
                button.level_value = value;
                self.redraw_button(container_id, button, render);
            }
        }
    }

    fn redraw_button(&self, container_id: i32, button: &Button, render: &dyn RenderSurface) {
        let bitmap = button.active_state().bitmap(self.generation);
        render.display_button(
            button.handle,
            container_id as u32,
            bitmap,
            button.geometry.width,
            button.geometry.height,
            button.geometry.x,
            button.geometry.y,
            false,
        );
    }

    /// Apply `f` to every button addressed by `port` whose `channel` falls
    /// in `channels` (an empty slice addresses every button on `port`),
    /// across the active page and its visible popups, then redraw each
    /// touched button.
    pub fn apply_to_buttons(
        &mut self,
        port: u16,
        channels: &[u16],
        render: &dyn RenderSurface,
        mut f: impl FnMut(&mut Button),
    ) -> usize {
        let mut touched = 0;
        for container_id in self.active_container_ids() {
            let Some(buttons) = self.container_buttons_mut(container_id) else {
                continue;
            };
            for button in buttons.iter_mut() {
                if button.address_port != port {
                    continue;
                }
                if !channels.is_empty() && !channels.contains(&button.address_channel) {
                    continue;
                }
                f(button);
                touched += 1;
                self.redraw_button(container_id, button, render);
            }
        }
        touched
    }
}
