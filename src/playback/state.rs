#[derive(Debug, PartialEq, Clone, Copy)]
pub enum PlaybackPhase {
    Static,           // Still image, no hold timer: redraw, never change on its own
    AnimationPlaying, // Animated image, no hold timer: step frames by their delays
    TimedHold,        // Hold timer running towards the next item
    Transitioning,    // Crossfading from the current item to the pre-fetched next one
}
