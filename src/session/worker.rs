use std::sync::mpsc::Sender;

use super::SessionEvent;

/// Runs blocking collaborator work off the gesture loop and posts the
/// result back as a [`SessionEvent`].
pub(super) fn spawn_worker_action<T, W, H>(sender: &Sender<SessionEvent>, work: W, into_event: H)
where
    T: Send + 'static,
    W: FnOnce() -> T + Send + 'static,
    H: FnOnce(T) -> SessionEvent + Send + 'static,
{
    let tx = sender.clone();
    std::thread::spawn(move || {
        let event = into_event(work());
        if tx.send(event).is_err() {
            tracing::debug!("session dropped before worker result arrived");
        }
    });
}
