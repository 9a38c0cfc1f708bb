//! Session orchestration: owns both editors, wires the subject size into the
//! placement editor and turns their state into a composition request.

mod runtime;
mod worker;

use std::fmt;

use crate::config::AppConfig;
use crate::decode::{DecodeResult, LoadedImage};
use crate::editor::{
    Placement, PlacementClickPolicy, PlacementEditor, PlacementGesture, SubjectEditor,
    SubjectGesture, DEFAULT_PLACEMENT_SIZE,
};
use crate::geometry::{DisplayMapping, ImageSize, Point, Rect, Size};
use crate::request::{build_request, CompositionRequest, RequestInputs, DEFAULT_OUTPUT_FILENAME};
use crate::transport::{OutputLocator, TransportResult};

pub use runtime::SessionRuntime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSide {
    Source,
    Target,
}

impl fmt::Display for ImageSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Target => f.write_str("target"),
        }
    }
}

/// Completion of an asynchronous collaborator call.
#[derive(Debug)]
pub enum SessionEvent {
    ImageDecoded {
        side: ImageSide,
        result: DecodeResult<LoadedImage>,
    },
    ImageUploaded {
        side: ImageSide,
        result: TransportResult<String>,
    },
    CompositeFinished {
        result: TransportResult<OutputLocator>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingInput {
    SourceImage,
    TargetImage,
    SourceUpload,
    TargetUpload,
    PlacementPoint,
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SourceImage => "source image not loaded",
            Self::TargetImage => "target image not loaded",
            Self::SourceUpload => "source image not uploaded",
            Self::TargetUpload => "target image not uploaded",
            Self::PlacementPoint => "placement point not chosen",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ready(CompositionRequest),
    NotReady(MissingInput),
}

/// A committed subject change together with the placement it resized, if
/// one was already placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubjectChange {
    pub rect: Rect,
    pub placement: Option<Placement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub output_filename: String,
    pub placement_click: PlacementClickPolicy,
    pub cache_bust_output: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            output_filename: DEFAULT_OUTPUT_FILENAME.to_string(),
            placement_click: PlacementClickPolicy::default(),
            cache_bust_output: true,
        }
    }
}

impl From<&AppConfig> for SessionSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            output_filename: config.output_filename.clone(),
            placement_click: config.placement_click,
            cache_bust_output: config.cache_bust_output,
        }
    }
}

#[derive(Debug, Default)]
pub struct Session {
    settings: SessionSettings,
    subject: Option<SubjectEditor>,
    placement: Option<PlacementEditor>,
    source_filename: Option<String>,
    target_filename: Option<String>,
    last_request: Option<CompositionRequest>,
    output: Option<OutputLocator>,
    last_error: Option<String>,
    composite_pending: bool,
}

impl Session {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Marks a new file as chosen for `side`. The previous upload no longer
    /// describes what the editor will show, so its filename is dropped.
    pub fn begin_load(&mut self, side: ImageSide) {
        *self.filename_slot(side) = None;
        tracing::debug!(%side, "image load started");
    }

    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ImageDecoded {
                side,
                result: Ok(image),
            } => self.install_image(side, image),
            SessionEvent::ImageDecoded {
                side,
                result: Err(err),
            } => {
                tracing::warn!(%side, %err, "image decode failed");
                self.last_error = Some(format!("{side} image: {err}"));
                self.drop_image(side);
            }
            SessionEvent::ImageUploaded {
                side,
                result: Ok(filename),
            } => {
                tracing::info!(%side, %filename, "image uploaded");
                *self.filename_slot(side) = Some(filename);
            }
            SessionEvent::ImageUploaded {
                side,
                result: Err(err),
            } => {
                tracing::warn!(%side, %err, "image upload failed");
                self.last_error = Some(format!("{side} upload: {err}"));
            }
            SessionEvent::CompositeFinished { result: Ok(output) } => {
                tracing::info!(url = %output.url, "composite ready");
                self.composite_pending = false;
                self.last_error = None;
                self.output = Some(output);
            }
            SessionEvent::CompositeFinished { result: Err(err) } => {
                tracing::warn!(%err, "composite request failed");
                self.composite_pending = false;
                self.last_error = Some(format!("composite: {err}"));
            }
        }
    }

    pub fn subject_gesture(&mut self, gesture: SubjectGesture) -> Option<SubjectChange> {
        let Some(subject) = self.subject.as_mut() else {
            tracing::debug!(?gesture, "no source image; subject gesture suppressed");
            return None;
        };
        let rect = subject.handle(gesture)?;
        let placement = self
            .placement
            .as_mut()
            .and_then(|placement| placement.sync_subject_size(rect.size()));
        Some(SubjectChange { rect, placement })
    }

    pub fn placement_click(&mut self, point: Point) -> Option<Placement> {
        let Some(placement) = self.placement.as_mut() else {
            tracing::debug!("no target image; placement click suppressed");
            return None;
        };
        placement.click(point)
    }

    pub fn placement_gesture(&mut self, gesture: PlacementGesture) -> Option<Placement> {
        let Some(placement) = self.placement.as_mut() else {
            tracing::debug!(?gesture, "no target image; placement gesture suppressed");
            return None;
        };
        placement.handle(gesture)
    }

    /// Builds the request from the current editor state. Nothing is recorded
    /// unless every input is present.
    pub fn prepare_submission(&mut self) -> SubmitOutcome {
        let outcome = self.build_submission();
        match &outcome {
            SubmitOutcome::Ready(request) => {
                self.last_request = Some(request.clone());
                self.composite_pending = true;
            }
            SubmitOutcome::NotReady(missing) => {
                tracing::debug!(%missing, "submission not ready");
            }
        }
        outcome
    }

    fn build_submission(&self) -> SubmitOutcome {
        let Some(subject) = self.subject.as_ref() else {
            return SubmitOutcome::NotReady(MissingInput::SourceImage);
        };
        let Some(placement) = self.placement.as_ref() else {
            return SubmitOutcome::NotReady(MissingInput::TargetImage);
        };
        let Some(source_filename) = self.source_filename.as_deref() else {
            return SubmitOutcome::NotReady(MissingInput::SourceUpload);
        };
        let Some(target_filename) = self.target_filename.as_deref() else {
            return SubmitOutcome::NotReady(MissingInput::TargetUpload);
        };

        let inputs = RequestInputs {
            source_filename,
            target_filename,
            output_filename: &self.settings.output_filename,
            source_image: subject.image_size(),
            target_image: placement.image_size(),
            subject: Some(subject.rect()),
            placement: placement.point(),
        };
        match build_request(&inputs) {
            Some(request) => SubmitOutcome::Ready(request),
            None => SubmitOutcome::NotReady(MissingInput::PlacementPoint),
        }
    }

    pub fn subject_rect(&self) -> Option<Rect> {
        self.subject.as_ref().map(SubjectEditor::rect)
    }

    pub fn placement(&self) -> Option<Placement> {
        self.placement.as_ref().and_then(PlacementEditor::placement)
    }

    pub fn placement_size(&self) -> Option<Size> {
        self.placement.as_ref().map(PlacementEditor::size)
    }

    pub fn image_size(&self, side: ImageSide) -> Option<ImageSize> {
        match side {
            ImageSide::Source => self.subject.as_ref().map(SubjectEditor::image_size),
            ImageSide::Target => self.placement.as_ref().map(PlacementEditor::image_size),
        }
    }

    /// Mapping from a display canvas of `canvas` size onto the image loaded
    /// for `side`.
    pub fn display_mapping(&self, side: ImageSide, canvas: Size) -> Option<DisplayMapping> {
        self.image_size(side).map(|image| DisplayMapping::new(canvas, image))
    }

    pub fn filename(&self, side: ImageSide) -> Option<&str> {
        match side {
            ImageSide::Source => self.source_filename.as_deref(),
            ImageSide::Target => self.target_filename.as_deref(),
        }
    }

    pub fn last_request(&self) -> Option<&CompositionRequest> {
        self.last_request.as_ref()
    }

    pub fn output(&self) -> Option<&OutputLocator> {
        self.output.as_ref()
    }

    /// Output URL as it should be displayed, cache-busted when configured.
    pub fn output_url(&self) -> Option<String> {
        self.output
            .as_ref()
            .map(|output| output.display_url(self.settings.cache_bust_output))
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_composite_pending(&self) -> bool {
        self.composite_pending
    }

    fn install_image(&mut self, side: ImageSide, image: LoadedImage) {
        let size = image.size();
        tracing::info!(
            %side,
            name = image.name(),
            width = size.width,
            height = size.height,
            "image loaded"
        );
        match side {
            ImageSide::Source => {
                let subject = SubjectEditor::new(image);
                // Not a gesture, so nothing is emitted; `placement()` reflects it.
                if let Some(placement) = self.placement.as_mut() {
                    placement.sync_subject_size(subject.rect().size());
                }
                self.subject = Some(subject);
            }
            ImageSide::Target => {
                let subject_size = self
                    .subject_rect()
                    .map_or(DEFAULT_PLACEMENT_SIZE, |rect| rect.size());
                self.placement = Some(PlacementEditor::new(
                    image,
                    subject_size,
                    self.settings.placement_click,
                ));
            }
        }
    }

    /// Forgets the side's editor so its filename can never be paired with
    /// an image from an earlier file.
    fn drop_image(&mut self, side: ImageSide) {
        match side {
            ImageSide::Source => self.subject = None,
            ImageSide::Target => self.placement = None,
        }
    }

    fn filename_slot(&mut self, side: ImageSide) -> &mut Option<String> {
        match side {
            ImageSide::Source => &mut self.source_filename,
            ImageSide::Target => &mut self.target_filename,
        }
    }
}
