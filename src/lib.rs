pub mod cli;
pub mod config;
pub mod decode;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod request;
pub mod session;
pub mod transport;

use std::time::Duration;

pub use error::{AppError, AppResult};

use cli::CliOptions;
use editor::{PlacementGesture, Scale, SubjectGesture, DEFAULT_SUBJECT_RECT};
use geometry::{Point, Rect};
use session::{ImageSide, SessionRuntime, SubmitOutcome};

/// Loads both images, applies the requested geometry, submits it and returns
/// the output image URL.
pub fn run(options: &CliOptions) -> AppResult<String> {
    let mut config = config::load_app_config(options.config_path.as_deref());
    if let Some(server_url) = &options.server_url {
        config.server_url = server_url.clone();
    }
    if options.verbose {
        config.log_filter = "debug".to_string();
    }
    logging::init(&config.log_filter);
    tracing::info!(server = %config.server_url, "starting image-adjuster");

    let mut runtime = SessionRuntime::with_http(&config)?;
    for (side, path) in [
        (ImageSide::Source, &options.source),
        (ImageSide::Target, &options.target),
    ] {
        let bytes = std::fs::read(path).map_err(|err| AppError::ReadInput {
            path: path.clone(),
            source: err,
        })?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("image");
        runtime.load_image(side, file_name, bytes);
    }
    wait_for(&mut runtime, options.wait(), "image loading")?;

    for side in [ImageSide::Source, ImageSide::Target] {
        if runtime.session().image_size(side).is_none() {
            return Err(AppError::ImageUnavailable {
                side: side.to_string(),
                message: runtime
                    .session()
                    .last_error()
                    .unwrap_or("decode did not finish")
                    .to_string(),
            });
        }
    }

    if let Some(subject) = options.subject {
        let subject = match canvas_mapping(&runtime, options, ImageSide::Source) {
            Some(mapping) => mapping.canvas_rect_to_image(subject),
            None => subject,
        };
        apply_subject_box(&mut runtime, subject);
    }
    let target_mapping = canvas_mapping(&runtime, options, ImageSide::Target);
    let to_image = |point: Point| match target_mapping {
        Some(mapping) => mapping.canvas_to_image(point.x, point.y),
        None => point,
    };
    runtime.placement_click(to_image(options.place));
    if let Some(position) = options.drag_to.map(to_image) {
        runtime.placement_gesture(PlacementGesture::DragStart);
        runtime.placement_gesture(PlacementGesture::DragEnd { position });
    }

    if let SubmitOutcome::NotReady(missing) = runtime.submit() {
        if let Some(message) = runtime.session().last_error() {
            tracing::warn!(error = message, "last collaborator error");
        }
        return Err(AppError::Incomplete(missing));
    }
    wait_for(&mut runtime, options.wait(), "compositing")?;

    let session = runtime.session();
    session
        .output_url()
        .ok_or_else(|| AppError::CompositeFailed {
            message: session
                .last_error()
                .unwrap_or("no output returned")
                .to_string(),
        })
}

fn canvas_mapping(
    runtime: &SessionRuntime,
    options: &CliOptions,
    side: ImageSide,
) -> Option<geometry::DisplayMapping> {
    let canvas = options.canvas?;
    runtime.session().display_mapping(side, canvas)
}

/// Reproduces a box as a resize gesture would: scale relative to the current
/// box, anchored at the new origin.
fn apply_subject_box(runtime: &mut SessionRuntime, target: Rect) {
    let current = runtime
        .session()
        .subject_rect()
        .unwrap_or(DEFAULT_SUBJECT_RECT);
    let scale = Scale::new(target.width / current.width, target.height / current.height);
    runtime.subject_gesture(SubjectGesture::ResizeStart);
    runtime.subject_gesture(SubjectGesture::ResizeEnd {
        position: target.origin(),
        scale,
    });
}

fn wait_for(runtime: &mut SessionRuntime, timeout: Duration, stage: &'static str) -> AppResult<()> {
    if runtime.wait_idle(timeout) {
        Ok(())
    } else {
        Err(AppError::Timeout {
            stage,
            seconds: timeout.as_secs(),
        })
    }
}
