//! Tick-driven playback on top of the [`Navigator`](crate::navigator::Navigator):
//! manual steps, timed auto-advance, crossfades and animation frame timing.

pub mod engine;
pub mod slide;
pub mod state;

pub use engine::{Layer, Playback, Scene, Step, crossfade_opacity};
pub use slide::Slide;
pub use state::PlaybackPhase;
