//! Custom event types for the studio UI.

use crossterm::event::KeyEvent;

use crate::agent::{LoopEvent, LoopState};

/// Events that can occur in a studio session
#[derive(Debug)]
pub enum StudioEvent {
    /// User keyboard input
    Key(KeyEvent),
    /// Progress from the repair loop running in the background
    Loop(LoopEvent),
    /// The background run ended, successfully or not
    RunFinished(Result<LoopState, String>),
}
