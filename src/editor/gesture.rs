use thiserror::Error;

/// Exclusive pointer gesture a shape editor can be in the middle of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging,
    Resizing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    DragStart,
    DragMove,
    DragEnd,
    ResizeStart,
    ResizeMove,
    ResizeEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("gesture event {event:?} is not accepted while {from:?}")]
pub struct GestureError {
    pub from: GestureState,
    pub event: GestureEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GestureMachine {
    state: GestureState,
}

impl GestureMachine {
    pub const fn new() -> Self {
        Self {
            state: GestureState::Idle,
        }
    }

    pub const fn state(&self) -> GestureState {
        self.state
    }

    pub const fn is_idle(&self) -> bool {
        matches!(self.state, GestureState::Idle)
    }

    pub fn can_transition(&self, event: GestureEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: GestureEvent) -> Option<GestureState> {
        use GestureEvent::*;
        match (self.state, event) {
            (GestureState::Idle, DragStart) => Some(GestureState::Dragging),
            (GestureState::Idle, ResizeStart) => Some(GestureState::Resizing),
            (GestureState::Dragging, DragMove) => Some(GestureState::Dragging),
            (GestureState::Dragging, DragEnd) => Some(GestureState::Idle),
            (GestureState::Resizing, ResizeMove) => Some(GestureState::Resizing),
            (GestureState::Resizing, ResizeEnd) => Some(GestureState::Idle),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: GestureEvent) -> Result<GestureState, GestureError> {
        let next = self.next_state(event).ok_or(GestureError {
            from: self.state,
            event,
        })?;
        self.state = next;
        Ok(next)
    }

    pub fn reset(&mut self) {
        self.state = GestureState::Idle;
    }
}
