//! Wire types exchanged with the compositing service and the builder that
//! turns editor state into a request.

use serde::{Deserialize, Serialize};

use crate::geometry::{ImageSize, Point, Rect};

pub const DEFAULT_OUTPUT_FILENAME: &str = "output.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDimensions {
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireBox {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePoint {
    pub x: i64,
    pub y: i64,
}

/// One-shot request sent to the compositor. Every number is already an
/// integer pixel coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionRequest {
    pub source_image_filename: String,
    pub target_image_filename: String,
    pub output_image_filename: String,
    pub source_image: WireDimensions,
    pub subject_box: WireBox,
    pub target_image: WireDimensions,
    pub placement_point: WirePoint,
}

/// Body returned by the compositor's adjust endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub crop_box: Option<WireBox>,
    #[serde(default)]
    pub placement_box: Option<WireBox>,
    pub output_image_path: String,
}

#[derive(Debug, Clone, Copy)]
pub struct RequestInputs<'a> {
    pub source_filename: &'a str,
    pub target_filename: &'a str,
    pub output_filename: &'a str,
    pub source_image: ImageSize,
    pub target_image: ImageSize,
    pub subject: Option<Rect>,
    pub placement: Option<Point>,
}

/// Builds the compositor request, or `None` while either the subject box or
/// the placement point is missing.
pub fn build_request(inputs: &RequestInputs<'_>) -> Option<CompositionRequest> {
    let subject = inputs.subject?;
    let placement = inputs.placement?;

    Some(CompositionRequest {
        source_image_filename: inputs.source_filename.to_string(),
        target_image_filename: inputs.target_filename.to_string(),
        output_image_filename: inputs.output_filename.to_string(),
        source_image: wire_dimensions(inputs.source_image),
        subject_box: WireBox {
            x: round_coordinate(subject.x),
            y: round_coordinate(subject.y),
            width: round_coordinate(subject.width),
            height: round_coordinate(subject.height),
        },
        target_image: wire_dimensions(inputs.target_image),
        placement_point: WirePoint {
            x: round_coordinate(placement.x),
            y: round_coordinate(placement.y),
        },
    })
}

/// Nearest integer, halves rounded away from zero. Non-finite values map to
/// zero and out-of-range values saturate.
pub fn round_coordinate(value: f64) -> i64 {
    if value.is_finite() {
        value.round() as i64
    } else {
        0
    }
}

fn wire_dimensions(size: ImageSize) -> WireDimensions {
    WireDimensions {
        width: i64::from(size.width),
        height: i64::from(size.height),
    }
}
