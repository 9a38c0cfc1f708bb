//! Shared geometric primitives used by the editors and the request builder.
//!
//! Every coordinate is expressed in the native pixel grid of the image it
//! overlays, never in a display-scaled space.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub const fn with_origin(self, origin: Point) -> Self {
        Self::new(origin.x, origin.y, self.width, self.height)
    }
}

/// Intrinsic pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Maps pointer positions reported by a scaled display canvas back into the
/// image's own pixel grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMapping {
    canvas: Size,
    image: ImageSize,
}

impl DisplayMapping {
    pub fn new(canvas: Size, image: ImageSize) -> Self {
        Self {
            canvas: Size::new(canvas.width.max(1.0), canvas.height.max(1.0)),
            image,
        }
    }

    pub fn canvas_to_image(&self, canvas_x: f64, canvas_y: f64) -> Point {
        let source_width = f64::from(self.image.width.max(1));
        let source_height = f64::from(self.image.height.max(1));
        let x = canvas_x.clamp(0.0, self.canvas.width) * source_width / self.canvas.width;
        let y = canvas_y.clamp(0.0, self.canvas.height) * source_height / self.canvas.height;
        Point::new(x, y)
    }

    pub fn canvas_rect_to_image(&self, rect: Rect) -> Rect {
        let origin = self.canvas_to_image(rect.x, rect.y);
        let corner = self.canvas_to_image(rect.x + rect.width, rect.y + rect.height);
        Rect::new(origin.x, origin.y, corner.x - origin.x, corner.y - origin.y)
    }
}
