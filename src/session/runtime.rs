use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::worker::spawn_worker_action;
use super::{ImageSide, Session, SessionEvent, SessionSettings, SubjectChange, SubmitOutcome};
use crate::config::AppConfig;
use crate::decode::{ImageCrateDecoder, ImageDecoder};
use crate::editor::{Placement, PlacementGesture, SubjectGesture};
use crate::geometry::Point;
use crate::transport::{CompositingTransport, HttpTransport, TransportResult, UploadTransport};

/// Drives a [`Session`] against its collaborators. Decoding, uploads and
/// compositing run on worker threads; their results are applied only from
/// [`SessionRuntime::pump`] or [`SessionRuntime::wait_idle`], so the session
/// itself is never touched concurrently.
pub struct SessionRuntime {
    session: Session,
    decoder: Arc<dyn ImageDecoder>,
    uploader: Arc<dyn UploadTransport>,
    compositor: Arc<dyn CompositingTransport>,
    sender: Sender<SessionEvent>,
    receiver: Receiver<SessionEvent>,
    in_flight: usize,
}

impl SessionRuntime {
    pub fn new(
        session: Session,
        decoder: Arc<dyn ImageDecoder>,
        uploader: Arc<dyn UploadTransport>,
        compositor: Arc<dyn CompositingTransport>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            session,
            decoder,
            uploader,
            compositor,
            sender,
            receiver,
            in_flight: 0,
        }
    }

    /// Runtime talking to the HTTP compositing service named in `config`.
    pub fn with_http(config: &AppConfig) -> TransportResult<Self> {
        let http = Arc::new(HttpTransport::new(
            config.server_url.clone(),
            config.request_timeout(),
        )?);
        Ok(Self::new(
            Session::new(SessionSettings::from(config)),
            Arc::new(ImageCrateDecoder),
            http.clone(),
            http,
        ))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Starts decoding and uploading a newly chosen file for `side`.
    pub fn load_image(&mut self, side: ImageSide, file_name: &str, bytes: Vec<u8>) {
        self.session.begin_load(side);
        let bytes: Arc<[u8]> = bytes.into();

        let decoder = Arc::clone(&self.decoder);
        let name = file_name.to_string();
        let decode_bytes = Arc::clone(&bytes);
        spawn_worker_action(
            &self.sender,
            move || decoder.decode(&name, &decode_bytes),
            move |result| SessionEvent::ImageDecoded { side, result },
        );

        let uploader = Arc::clone(&self.uploader);
        let name = file_name.to_string();
        spawn_worker_action(
            &self.sender,
            move || uploader.upload(&name, &bytes),
            move |result| SessionEvent::ImageUploaded { side, result },
        );

        self.in_flight += 2;
    }

    pub fn subject_gesture(&mut self, gesture: SubjectGesture) -> Option<SubjectChange> {
        self.session.subject_gesture(gesture)
    }

    pub fn placement_click(&mut self, point: Point) -> Option<Placement> {
        self.session.placement_click(point)
    }

    pub fn placement_gesture(&mut self, gesture: PlacementGesture) -> Option<Placement> {
        self.session.placement_gesture(gesture)
    }

    /// Builds the request and, when complete, hands it to the compositor.
    pub fn submit(&mut self) -> SubmitOutcome {
        let outcome = self.session.prepare_submission();
        if let SubmitOutcome::Ready(request) = &outcome {
            let compositor = Arc::clone(&self.compositor);
            let request = request.clone();
            spawn_worker_action(
                &self.sender,
                move || compositor.composite(&request),
                |result| SessionEvent::CompositeFinished { result },
            );
            self.in_flight += 1;
        }
        outcome
    }

    /// Applies every finished result without blocking. Returns how many were
    /// applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Blocks until all outstanding work reported back or `timeout` elapsed.
    /// Returns `true` when nothing is left in flight.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(event) => self.apply(event),
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(in_flight = self.in_flight, "timed out waiting for workers");
                    return false;
                }
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        true
    }

    fn apply(&mut self, event: SessionEvent) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.session.apply(event);
    }
}
