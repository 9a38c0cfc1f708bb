use serde::Deserialize;

use super::gesture::{GestureEvent, GestureMachine, GestureState};
use super::subject::DEFAULT_SUBJECT_RECT;
use crate::decode::LoadedImage;
use crate::geometry::{ImageSize, Point, Rect, Size};

/// What a click on the target canvas does once a placement exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementClickPolicy {
    /// The placement only moves by dragging it.
    #[default]
    Ignore,
    /// The placement jumps to the clicked point.
    Relocate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementState {
    Unplaced,
    Placed { point: Point },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementGesture {
    DragStart,
    DragMove { position: Point },
    DragEnd { position: Point },
}

impl PlacementGesture {
    const fn event(&self) -> GestureEvent {
        match self {
            Self::DragStart => GestureEvent::DragStart,
            Self::DragMove { .. } => GestureEvent::DragMove,
            Self::DragEnd { .. } => GestureEvent::DragEnd,
        }
    }
}

/// Placement rectangle as emitted to observers: the chosen anchor plus the
/// size mirrored from the subject box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub point: Point,
    pub size: Size,
}

impl Placement {
    pub const fn rect(&self) -> Rect {
        Rect::new(self.point.x, self.point.y, self.size.width, self.size.height)
    }
}

/// Placement anchor over the target image. Its size is never set directly;
/// it follows whatever the subject editor last committed.
#[derive(Debug, Clone)]
pub struct PlacementEditor {
    image: LoadedImage,
    state: PlacementState,
    size: Size,
    click_policy: PlacementClickPolicy,
    preview: Option<Point>,
    gestures: GestureMachine,
}

impl PlacementEditor {
    pub fn new(image: LoadedImage, subject_size: Size, click_policy: PlacementClickPolicy) -> Self {
        Self {
            image,
            state: PlacementState::Unplaced,
            size: subject_size,
            click_policy,
            preview: None,
            gestures: GestureMachine::new(),
        }
    }

    pub const fn image_size(&self) -> ImageSize {
        self.image.size()
    }

    pub const fn state(&self) -> PlacementState {
        self.state
    }

    pub const fn size(&self) -> Size {
        self.size
    }

    pub const fn point(&self) -> Option<Point> {
        match self.state {
            PlacementState::Unplaced => None,
            PlacementState::Placed { point } => Some(point),
        }
    }

    pub fn placement(&self) -> Option<Placement> {
        self.point().map(|point| Placement {
            point,
            size: self.size,
        })
    }

    /// Placement as currently shown, including an in-flight drag.
    pub fn live_placement(&self) -> Option<Placement> {
        let point = self.preview.or_else(|| self.point())?;
        Some(Placement {
            point,
            size: self.size,
        })
    }

    pub const fn gesture_state(&self) -> GestureState {
        self.gestures.state()
    }

    pub fn click(&mut self, point: Point) -> Option<Placement> {
        if !self.gestures.is_idle() {
            tracing::debug!(state = ?self.gestures.state(), "ignoring click during drag");
            return None;
        }
        match (self.state, self.click_policy) {
            (PlacementState::Unplaced, _)
            | (PlacementState::Placed { .. }, PlacementClickPolicy::Relocate) => {
                Some(self.place(point))
            }
            (PlacementState::Placed { .. }, PlacementClickPolicy::Ignore) => {
                tracing::debug!(x = point.x, y = point.y, "placement exists; click ignored");
                None
            }
        }
    }

    pub fn handle(&mut self, gesture: PlacementGesture) -> Option<Placement> {
        if matches!(self.state, PlacementState::Unplaced) {
            tracing::debug!(?gesture, "ignoring drag before placement exists");
            return None;
        }
        if let Err(err) = self.gestures.transition(gesture.event()) {
            tracing::debug!(%err, "ignoring placement gesture");
            return None;
        }

        match gesture {
            PlacementGesture::DragStart => {
                self.preview = self.point();
                None
            }
            PlacementGesture::DragMove { position } => {
                self.preview = Some(position);
                None
            }
            PlacementGesture::DragEnd { position } => Some(self.place(position)),
        }
    }

    /// Refreshes the derived size from the subject box. Emits only when a
    /// placement exists to be redrawn.
    pub fn sync_subject_size(&mut self, size: Size) -> Option<Placement> {
        self.size = size;
        self.placement()
    }

    /// Drops the placement. The size stays tied to the subject box.
    pub fn reset(&mut self) {
        self.state = PlacementState::Unplaced;
        self.preview = None;
        self.gestures.reset();
    }

    fn place(&mut self, point: Point) -> Placement {
        self.state = PlacementState::Placed { point };
        self.preview = None;
        tracing::debug!(x = point.x, y = point.y, "placement point committed");
        Placement {
            point,
            size: self.size,
        }
    }
}

pub const DEFAULT_PLACEMENT_SIZE: Size = DEFAULT_SUBJECT_RECT.size();
