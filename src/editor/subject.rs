use super::gesture::{GestureEvent, GestureMachine, GestureState};
use crate::decode::LoadedImage;
use crate::geometry::{ImageSize, Point, Rect};

/// Smallest width or height an edited shape may collapse to.
pub const MIN_DIMENSION: f64 = 5.0;

pub const DEFAULT_SUBJECT_RECT: Rect = Rect::new(50.0, 50.0, 100.0, 100.0);

/// Scale factors accumulated by a resize handle since the gesture started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub x: f64,
    pub y: f64,
}

impl Scale {
    pub const IDENTITY: Scale = Scale { x: 1.0, y: 1.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubjectGesture {
    DragStart,
    DragMove { position: Point },
    DragEnd { position: Point },
    ResizeStart,
    ResizeMove { position: Point, scale: Scale },
    ResizeEnd { position: Point, scale: Scale },
}

impl SubjectGesture {
    pub const fn event(&self) -> GestureEvent {
        match self {
            Self::DragStart => GestureEvent::DragStart,
            Self::DragMove { .. } => GestureEvent::DragMove,
            Self::DragEnd { .. } => GestureEvent::DragEnd,
            Self::ResizeStart => GestureEvent::ResizeStart,
            Self::ResizeMove { .. } => GestureEvent::ResizeMove,
            Self::ResizeEnd { .. } => GestureEvent::ResizeEnd,
        }
    }
}

/// Editable subject box over the source image.
#[derive(Debug, Clone)]
pub struct SubjectEditor {
    image: LoadedImage,
    rect: Rect,
    preview: Option<Rect>,
    gestures: GestureMachine,
}

impl SubjectEditor {
    pub fn new(image: LoadedImage) -> Self {
        Self {
            image,
            rect: DEFAULT_SUBJECT_RECT,
            preview: None,
            gestures: GestureMachine::new(),
        }
    }

    pub const fn image_size(&self) -> ImageSize {
        self.image.size()
    }

    /// Last committed rectangle.
    pub const fn rect(&self) -> Rect {
        self.rect
    }

    /// Rectangle as currently shown, including an in-flight gesture.
    pub fn live_rect(&self) -> Rect {
        self.preview.unwrap_or(self.rect)
    }

    pub const fn gesture_state(&self) -> GestureState {
        self.gestures.state()
    }

    /// Applies a gesture event and returns the rectangle when it committed a
    /// change. Events that do not fit the current gesture are dropped.
    pub fn handle(&mut self, gesture: SubjectGesture) -> Option<Rect> {
        if let Err(err) = self.gestures.transition(gesture.event()) {
            tracing::debug!(%err, "ignoring subject gesture");
            return None;
        }

        match gesture {
            SubjectGesture::DragStart | SubjectGesture::ResizeStart => {
                self.preview = Some(self.rect);
                None
            }
            SubjectGesture::DragMove { position } => {
                self.preview = Some(self.rect.with_origin(position));
                None
            }
            SubjectGesture::ResizeMove { position, scale } => {
                self.preview = Some(scaled_rect(self.rect, position, scale));
                None
            }
            SubjectGesture::DragEnd { position } => {
                Some(self.commit(self.rect.with_origin(position)))
            }
            SubjectGesture::ResizeEnd { position, scale } => {
                Some(self.commit(scaled_rect(self.rect, position, scale)))
            }
        }
    }

    /// Restores the default box and abandons any gesture in progress.
    pub fn reset(&mut self) {
        self.rect = DEFAULT_SUBJECT_RECT;
        self.preview = None;
        self.gestures.reset();
    }

    fn commit(&mut self, rect: Rect) -> Rect {
        self.rect = rect;
        self.preview = None;
        tracing::debug!(
            x = rect.x,
            y = rect.y,
            width = rect.width,
            height = rect.height,
            "subject box committed"
        );
        rect
    }
}

/// Folds a resize transform's scale into the box dimensions so the scale
/// never outlives the gesture.
pub(crate) fn scaled_rect(rect: Rect, position: Point, scale: Scale) -> Rect {
    Rect::new(
        position.x,
        position.y,
        scaled_dimension(rect.width, scale.x),
        scaled_dimension(rect.height, scale.y),
    )
}

fn scaled_dimension(dimension: f64, factor: f64) -> f64 {
    let factor = if factor.is_finite() { factor.max(0.0) } else { 0.0 };
    (dimension * factor).max(MIN_DIMENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::blank_image;

    fn editor() -> SubjectEditor {
        SubjectEditor::new(blank_image("source.png", 796, 452))
    }

    fn drag(editor: &mut SubjectEditor, to: Point) -> Option<Rect> {
        editor.handle(SubjectGesture::DragStart);
        editor.handle(SubjectGesture::DragMove { position: to });
        editor.handle(SubjectGesture::DragEnd { position: to })
    }

    fn resize(editor: &mut SubjectEditor, to: Point, scale: Scale) -> Option<Rect> {
        editor.handle(SubjectGesture::ResizeStart);
        editor.handle(SubjectGesture::ResizeEnd {
            position: to,
            scale,
        })
    }

    #[test]
    fn new_editor_starts_with_default_box() {
        let editor = editor();
        assert_eq!(editor.rect(), Rect::new(50.0, 50.0, 100.0, 100.0));
        assert_eq!(editor.gesture_state(), GestureState::Idle);
        assert_eq!(editor.image_size(), ImageSize::new(796, 452));
    }

    #[test]
    fn drag_translates_without_changing_size() {
        let mut editor = editor();
        let first = drag(&mut editor, Point::new(120.5, 33.0)).expect("drag should commit");
        assert_eq!(first, Rect::new(120.5, 33.0, 100.0, 100.0));

        let second = drag(&mut editor, Point::new(-10.0, 400.0)).expect("drag should commit");
        assert_eq!(second, Rect::new(-10.0, 400.0, 100.0, 100.0));
    }

    #[test]
    fn drag_move_updates_preview_only() {
        let mut editor = editor();
        editor.handle(SubjectGesture::DragStart);
        let emitted = editor.handle(SubjectGesture::DragMove {
            position: Point::new(70.0, 80.0),
        });
        assert_eq!(emitted, None);
        assert_eq!(editor.live_rect(), Rect::new(70.0, 80.0, 100.0, 100.0));
        assert_eq!(editor.rect(), DEFAULT_SUBJECT_RECT);
    }

    #[test]
    fn resize_folds_scale_into_dimensions() {
        let mut editor = editor();
        let rect = resize(&mut editor, Point::new(40.0, 45.0), Scale::new(2.0, 1.5))
            .expect("resize should commit");
        assert_eq!(rect, Rect::new(40.0, 45.0, 200.0, 150.0));

        let rect = resize(&mut editor, Point::new(40.0, 45.0), Scale::new(0.5, 2.0))
            .expect("resize should commit");
        assert_eq!(rect, Rect::new(40.0, 45.0, 100.0, 300.0));
    }

    #[test]
    fn resize_clamps_to_minimum_dimension() {
        let mut editor = editor();
        let rect = resize(&mut editor, Point::new(50.0, 50.0), Scale::new(0.01, -3.0))
            .expect("resize should commit");
        assert_eq!(rect.width, MIN_DIMENSION);
        assert_eq!(rect.height, MIN_DIMENSION);

        let rect = resize(&mut editor, Point::new(50.0, 50.0), Scale::new(f64::NAN, f64::INFINITY))
            .expect("resize should commit");
        assert_eq!(rect.size(), crate::geometry::Size::new(MIN_DIMENSION, MIN_DIMENSION));
    }

    #[test]
    fn repeated_commit_without_gesture_is_ignored() {
        let mut editor = editor();
        resize(&mut editor, Point::new(50.0, 50.0), Scale::new(2.0, 2.0))
            .expect("resize should commit");
        let repeated = editor.handle(SubjectGesture::ResizeEnd {
            position: Point::new(50.0, 50.0),
            scale: Scale::new(2.0, 2.0),
        });
        assert_eq!(repeated, None);
        assert_eq!(editor.rect(), Rect::new(50.0, 50.0, 200.0, 200.0));
    }

    #[test]
    fn identity_resize_leaves_dimensions_unchanged() {
        let mut editor = editor();
        resize(&mut editor, Point::new(50.0, 50.0), Scale::new(1.5, 1.5))
            .expect("resize should commit");
        let rect = resize(&mut editor, Point::new(50.0, 50.0), Scale::IDENTITY)
            .expect("resize should commit");
        assert_eq!(rect, Rect::new(50.0, 50.0, 150.0, 150.0));
    }

    #[test]
    fn resize_events_are_ignored_mid_drag() {
        let mut editor = editor();
        editor.handle(SubjectGesture::DragStart);
        assert_eq!(editor.handle(SubjectGesture::ResizeStart), None);
        assert_eq!(
            editor.handle(SubjectGesture::ResizeEnd {
                position: Point::new(0.0, 0.0),
                scale: Scale::new(3.0, 3.0),
            }),
            None
        );
        assert_eq!(editor.gesture_state(), GestureState::Dragging);

        let rect = editor
            .handle(SubjectGesture::DragEnd {
                position: Point::new(60.0, 60.0),
            })
            .expect("drag end should commit");
        assert_eq!(rect, Rect::new(60.0, 60.0, 100.0, 100.0));
    }

    #[test]
    fn reset_restores_default_and_abandons_gesture() {
        let mut editor = editor();
        drag(&mut editor, Point::new(1.0, 2.0)).expect("drag should commit");
        editor.handle(SubjectGesture::ResizeStart);
        editor.reset();
        assert_eq!(editor.rect(), DEFAULT_SUBJECT_RECT);
        assert_eq!(editor.live_rect(), DEFAULT_SUBJECT_RECT);
        assert_eq!(editor.gesture_state(), GestureState::Idle);
    }
}
