//! Command-string interpretation (§4.5, §6.4): turns a received command
//! string into page/popup/button model mutations, and a received button
//! press into nothing here — that path stays in [`crate::protocol::outbound`].

pub mod color;
pub mod parser;

use crate::config::{Generation, SoundConfig};
use crate::model::button::Button;
use crate::model::manager::{PageManager, ProjectSource, Ref};
use crate::render::RenderSurface;
use parser::{ButtonProp, Command};

/// A popup show that requests a scheduled auto-hide: `(popup_id,
/// deciseconds, epoch)`, to be handed to the session's timeout scheduler.
pub type Timeout = (i32, u32, u64);

/// What executing one command string produced.
#[derive(Debug, Default)]
pub struct ExecResult {
    /// Command-string replies to send back to the controller, already
    /// formatted (`?BCF-1,1,ff0000ff` style), one per query command.
    pub replies: Vec<String>,
    /// Popup auto-hide timeouts to schedule.
    pub timeouts: Vec<Timeout>,
}

/// Owns the page/popup model and applies parsed command strings to it.
pub struct Interpreter {
    generation: Generation,
    pages: PageManager,
}

impl Interpreter {
    pub fn new(generation: Generation, project: Box<dyn ProjectSource>) -> Self {
        Interpreter { generation, pages: PageManager::new(project, generation) }
    }

    pub fn pages(&self) -> &PageManager {
        &self.pages
    }

    pub fn pages_mut(&mut self) -> &mut PageManager {
        &mut self.pages
    }

    /// Parse and apply one already-concatenated command string (§4.3 P9).
    pub fn execute(&mut self, text: &str, render: &dyn RenderSurface, sound: &SoundConfig) -> ExecResult {
        let command = parser::parse(text);
        let mut result = ExecResult::default();
        match command {
            Command::Page(name) => {
                self.pages.set_page(Ref::from(name.as_str()), false, render);
            }
            Command::PopupShow(popup, page) => {
                let page_ref = page.as_deref().map(Ref::from);
                if let Some(timeout) = self.pages.show_popup(Ref::from(popup.as_str()), page_ref, render) {
                    result.timeouts.push(timeout);
                }
            }
            Command::PopupHide(popup) => {
                self.pages.hide_popup(Ref::from(popup.as_str()), render);
            }
            Command::PopupToggle(popup) => {
                if let Some(timeout) = self.pages.toggle_popup(Ref::from(popup.as_str()), render) {
                    result.timeouts.push(timeout);
                }
            }
            Command::PopupHideGroup(group) => {
                self.pages.hide_group(&group, render);
            }
            Command::PopupHideAll => {
                self.pages.hide_all(render);
            }
            Command::PopupSetTimeout(popup, deciseconds) => {
                self.pages.set_popup_timeout(Ref::from(popup.as_str()), deciseconds);
            }
            Command::Button { ports, channels, prop, query } => {
                let ports = if ports.is_empty() { vec![0] } else { ports };
                if query {
                    for port in ports {
                        let channel = channels.first().copied().unwrap_or(0);
                        if let Some(reply) = self.query_button(port, channel, &prop) {
                            result.replies.push(reply);
                        }
                    }
                } else {
                    for port in ports {
                        self.pages.apply_to_buttons(port, &channels, render, |b| apply_prop(b, &prop));
                    }
                }
            }
            Command::Beep(kind) => {
                let file = match kind {
                    parser::BeepKind::Active | parser::BeepKind::Standard => &sound.single_beep,
                    parser::BeepKind::ActiveDouble | parser::BeepKind::StandardDouble => &sound.double_beep,
                };
                render.play_sound_at_volume(file, resolved_volume(sound));
            }
            Command::Overlay { opcode, raw } => {
                if opcode == "STP" {
                    render.stop_sound();
                } else {
                    tracing::debug!(opcode = %opcode, raw = %raw, "overlay command forwarded to embedder");
                }
            }
            Command::Unknown(raw) => {
                tracing::debug!(raw = %raw, "unrecognized command string");
            }
        }
        result
    }

    fn query_button(&self, port: u16, channel: u16, prop: &ButtonProp) -> Option<String> {
        let button = self.pages.find_button(port, channel)?;
        let state = button.active_state();
        let value = match prop {
            ButtonProp::Text(_) => state.text.clone(),
            ButtonProp::Bitmap(_) => state.bitmap(self.generation).unwrap_or_default().to_string(),
            ButtonProp::Icon(_) => state.icon_index.to_string(),
            ButtonProp::Font(_) => state.font_index.to_string(),
            ButtonProp::FillColor(_) => state.background_color.clone(),
            ButtonProp::BorderColor(_) => state.border_color.clone(),
            ButtonProp::TextColor(_) => state.text_color.clone(),
            ButtonProp::TextEffectName(_) => state.text_effect.clone(),
            ButtonProp::TextEffectColor(_) => state.effect_color.clone(),
            ButtonProp::Show(_) => (button.visible as u8).to_string(),
            ButtonProp::Enable(_) => (button.enabled as u8).to_string(),
            ButtonProp::BargraphLevel(_) => button.level_value.to_string(),
            ButtonProp::BargraphRange(_, _) => format!("{},{}", button.level_low, button.level_high),
        };
        Some(format!("{},{},{}", port, channel, value))
    }
}

/// Combine `tconfig.h`'s separately-configured system volume and gain into
/// the single 0-100 percent the rendering interface's `set_volume` takes.
fn resolved_volume(sound: &SoundConfig) -> u8 {
    (((sound.volume as u32) * (sound.gain as u32)) / 100).min(100) as u8
}

fn apply_prop(button: &mut Button, prop: &ButtonProp) {
    match prop {
        ButtonProp::Text(text) => button.active_state_mut().text = text.clone(),
        ButtonProp::Bitmap(file) => button.active_state_mut().bm = Some(file.clone()),
        ButtonProp::Icon(icon) => button.active_state_mut().icon_index = *icon,
        ButtonProp::Font(font) => button.active_state_mut().font_index = *font,
        ButtonProp::FillColor(color) => button.active_state_mut().background_color = format!("{color:?}"),
        ButtonProp::BorderColor(color) => button.active_state_mut().border_color = format!("{color:?}"),
        ButtonProp::TextColor(color) => button.active_state_mut().text_color = format!("{color:?}"),
        ButtonProp::TextEffectName(name) => button.active_state_mut().text_effect = name.clone(),
        ButtonProp::TextEffectColor(color) => button.active_state_mut().effect_color = format!("{color:?}"),
        ButtonProp::Show(visible) => button.visible = *visible,
        ButtonProp::Enable(enabled) => button.enabled = *enabled,
        ButtonProp::BargraphLevel(level) => button.level_value = *level,
        ButtonProp::BargraphRange(low, high) => {
            button.level_low = *low;
            button.level_high = *high;
        }
    }
}
