//! Shape editors for the subject box and the placement rectangle.

pub mod gesture;
pub mod placement;
pub mod subject;

pub use gesture::{GestureError, GestureEvent, GestureMachine, GestureState};
pub use placement::{
    Placement, PlacementClickPolicy, PlacementEditor, PlacementGesture, PlacementState,
    DEFAULT_PLACEMENT_SIZE,
};
pub use subject::{Scale, SubjectEditor, SubjectGesture, DEFAULT_SUBJECT_RECT, MIN_DIMENSION};
