//! The rendering interface (§6.6): "consumed, not implemented here." The
//! page/popup model drives an abstract surface through this trait; the
//! embedding application supplies the pixel rasterizer.

use crate::model::animation::AnimSpec;
use crate::model::geometry::Rect;

/// Calls the page/popup model makes outward. Default method bodies are
/// deliberately absent — every embedder must decide what each call means
/// for its surface.
pub trait RenderSurface: Send {
    fn display_page(&self, handle: u32, width: i32, height: i32);
    #[allow(clippy::too_many_arguments)]
    fn set_subpage(&self, handle: u32, parent: u32, left: i32, top: i32, width: i32, height: i32, animation: AnimSpec);
    fn drop_page(&self, handle: u32);
    fn drop_subpage(&self, handle: u32, parent: u32);
    #[allow(clippy::too_many_arguments)]
    fn display_button(
        &self,
        handle: u32,
        parent: u32,
        bitmap: Option<&str>,
        width: i32,
        height: i32,
        left: i32,
        top: i32,
        passthrough: bool,
    );
    fn set_background(&self, handle: u32, bitmap: Option<&str>, width: i32, height: i32, color: &str, opacity: u8);
    fn play_video(&self, handle: u32, parent: u32, rect: Rect, url: &str, user: &str, password: &str);
    fn play_sound(&self, file: &str);
    fn stop_sound(&self);
    fn mute_sound(&self, muted: bool);
    fn set_volume(&self, percent: u8);

    /// Play `file` at `volume` (0-100), resolved from `PanelConfig`'s
    /// system volume/gain (`tconfig.h`'s `getSystemVolume`/`getSystemGain`).
    /// Default body composes the two calls above in order; an embedder
    /// with one combined API point may override it directly.
    fn play_sound_at_volume(&self, file: &str, volume: u8) {
        self.set_volume(volume);
        self.play_sound(file);
    }
}

/// Input events the surface reports back into the model (§6.6: "Input
/// events are consumed from the surface").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Mouse { x: i32, y: i32, pressed: bool },
    Key(u32),
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// A recording surface used by tests to assert on call order without
    /// depending on a real rasterizer.
    #[derive(Default)]
    pub struct RecordingSurface {
        pub calls: Mutex<Vec<String>>,
    }

    impl RenderSurface for RecordingSurface {
        fn display_page(&self, handle: u32, width: i32, height: i32) {
            self.calls.lock().unwrap().push(format!("display_page({handle},{width},{height})"));
        }
        fn set_subpage(&self, handle: u32, parent: u32, left: i32, top: i32, width: i32, height: i32, _animation: AnimSpec) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("set_subpage({handle},{parent},{left},{top},{width},{height})"));
        }
        fn drop_page(&self, handle: u32) {
            self.calls.lock().unwrap().push(format!("drop_page({handle})"));
        }
        fn drop_subpage(&self, handle: u32, parent: u32) {
            self.calls.lock().unwrap().push(format!("drop_subpage({handle},{parent})"));
        }
        fn display_button(
            &self,
            handle: u32,
            parent: u32,
            _bitmap: Option<&str>,
            width: i32,
            height: i32,
            left: i32,
            top: i32,
            _passthrough: bool,
        ) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("display_button({handle},{parent},{width},{height},{left},{top})"));
        }
        fn set_background(&self, handle: u32, _bitmap: Option<&str>, width: i32, height: i32, color: &str, opacity: u8) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("set_background({handle},{width},{height},{color},{opacity})"));
        }
        fn play_video(&self, handle: u32, parent: u32, _rect: Rect, url: &str, _user: &str, _password: &str) {
            self.calls.lock().unwrap().push(format!("play_video({handle},{parent},{url})"));
        }
        fn play_sound(&self, file: &str) {
            self.calls.lock().unwrap().push(format!("play_sound({file})"));
        }
        fn stop_sound(&self) {
            self.calls.lock().unwrap().push("stop_sound()".to_string());
        }
        fn mute_sound(&self, muted: bool) {
            self.calls.lock().unwrap().push(format!("mute_sound({muted})"));
        }
        fn set_volume(&self, percent: u8) {
            self.calls.lock().unwrap().push(format!("set_volume({percent})"));
        }
    }
}
