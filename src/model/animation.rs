//! Show/hide animation specs (§4.6: "The model does not execute
//! animations; it emits begin/end events to the rendering interface which
//! drives them.").

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effect {
    #[default]
    None,
    Fade,
    SlideLeft,
    SlideRight,
    SlideTop,
    SlideBottom,
    SlideLeftFade,
    SlideRightFade,
    SlideTopFade,
    SlideBottomFade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnimSpec {
    pub effect: Effect,
    pub duration_ms: u32,
}

impl AnimSpec {
    pub const INSTANT: AnimSpec = AnimSpec {
        effect: Effect::None,
        duration_ms: 0,
    };
}
