//! Scoped file intake.
//!
//! The upload surface accepts files from an external input source (a drop
//! zone, a watcher, a line of stdin). [`IntakeHandle`] makes that a scoped
//! capability: attaching installs the handler task, dropping the handle
//! guarantees it is torn down. Submitted paths are validated against the
//! supported export formats before they reach the handler, so the pipeline
//! only ever sees candidate uploads.

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::ArchiveKind;

#[derive(Debug, Error)]
pub enum IntakeError {
    /// The path is not a supported export format.
    #[error("unsupported file '{0}': expected a .zip export or conversations.json")]
    Unsupported(String),
    /// The handle has been detached; no further submissions are accepted.
    #[error("intake is detached")]
    Detached,
}

/// Live file-intake scope. Dropping the handle detaches the handler.
pub struct IntakeHandle {
    tx: mpsc::UnboundedSender<PathBuf>,
    task: JoinHandle<()>,
}

impl IntakeHandle {
    /// Install `handler` for accepted files. The handler runs on a
    /// background task until the handle is dropped.
    pub fn attach<F>(handler: F) -> Self
    where
        F: Fn(PathBuf) + Send + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();
        let task = tokio::spawn(async move {
            while let Some(path) = rx.recv().await {
                handler(path);
            }
        });
        IntakeHandle { tx, task }
    }

    /// Offer a file. Rejects unsupported extensions before queueing.
    pub fn submit(&self, path: impl Into<PathBuf>) -> Result<(), IntakeError> {
        let path = path.into();
        if ArchiveKind::from_path(&path).is_none() {
            return Err(IntakeError::Unsupported(path.display().to_string()));
        }
        debug!(file = %path.display(), "file accepted for intake");
        self.tx.send(path).map_err(|_| IntakeError::Detached)
    }
}

impl Drop for IntakeHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handler_receives_accepted_files() {
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let intake = IntakeHandle::attach(move |path| {
            let _ = seen_tx.send(path);
        });

        intake.submit("export.zip").unwrap();
        intake.submit("conversations.json").unwrap();

        assert_eq!(seen_rx.recv().await.unwrap(), PathBuf::from("export.zip"));
        assert_eq!(
            seen_rx.recv().await.unwrap(),
            PathBuf::from("conversations.json")
        );
    }

    #[tokio::test]
    async fn test_unsupported_extension_never_reaches_handler() {
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let intake = IntakeHandle::attach(move |path| {
            let _ = seen_tx.send(path);
        });

        let err = intake.submit("notes.txt").unwrap_err();
        assert!(matches!(err, IntakeError::Unsupported(_)));

        intake.submit("ok.json").unwrap();
        // Only the valid file comes through; the .txt was dropped at the door.
        assert_eq!(seen_rx.recv().await.unwrap(), PathBuf::from("ok.json"));
        assert!(seen_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_drop_detaches_handler() {
        let intake = IntakeHandle::attach(|_| {});
        let tx = intake.tx.clone();
        drop(intake);

        // Give the aborted task a moment to wind down, then the channel
        // must be closed.
        tokio::task::yield_now().await;
        for _ in 0..100 {
            if tx.is_closed() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
        assert!(tx.is_closed());
    }
}
