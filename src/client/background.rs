//! A handler that cannot complete in bounded time (acoustic-fingerprint
//! style work) runs on a worker task instead of blocking the session. While
//! one is installed the session stops reading further input.

use tokio::task::JoinHandle;

use crate::error::AckError;

pub enum BackgroundOutcome {
    Ok(String),
    Err(AckError),
}

/// Owns the worker task and its cancellation flag. Dropping this before the
/// task finishes does not stop it — callers that need a hard stop must
/// `cancel()` first and then `join().await`, matching the "cancel, join,
/// then drop" sequencing a closing session needs.
pub struct BackgroundCommand {
    cancel: tokio_util_cancel::CancelFlag,
    handle: JoinHandle<BackgroundOutcome>,
}

/// Small cooperative-cancellation flag, kept local rather than pulling in
/// `tokio-util`'s `CancellationToken` for a single bool.
mod tokio_util_cancel {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Clone, Default)]
    pub struct CancelFlag(Arc<AtomicBool>);

    impl CancelFlag {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn cancel(&self) {
            self.0.store(true, Ordering::SeqCst);
        }

        pub fn is_cancelled(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }
}

impl BackgroundCommand {
    /// Spawns `run` (which should poll the given cancel flag cooperatively)
    /// on the tokio runtime.
    pub fn spawn<F, Fut>(run: F) -> Self
    where
        F: FnOnce(CancelHandle) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = BackgroundOutcome> + Send + 'static,
    {
        let cancel = tokio_util_cancel::CancelFlag::new();
        let handle = tokio::task::spawn(run(CancelHandle(cancel.clone())));
        Self { cancel, handle }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn join(self) -> Result<BackgroundOutcome, tokio::task::JoinError> {
        self.handle.await
    }
}

#[derive(Clone)]
pub struct CancelHandle(tokio_util_cancel::CancelFlag);

impl CancelHandle {
    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_with_ok_outcome() {
        let cmd = BackgroundCommand::spawn(|_cancel| async move {
            BackgroundOutcome::Ok("done".to_string())
        });
        match cmd.join().await.unwrap() {
            BackgroundOutcome::Ok(msg) => assert_eq!(msg, "done"),
            BackgroundOutcome::Err(_) => panic!("expected Ok"),
        }
    }

    #[tokio::test]
    async fn cancel_is_observed_by_the_running_task() {
        let cmd = BackgroundCommand::spawn(|cancel| async move {
            while !cancel.is_cancelled() {
                tokio::task::yield_now().await;
            }
            BackgroundOutcome::Err(AckError::system("cancelled"))
        });
        cmd.cancel();
        match cmd.join().await.unwrap() {
            BackgroundOutcome::Err(err) => assert_eq!(err.code, crate::error::AckCode::System),
            BackgroundOutcome::Ok(_) => panic!("expected cancellation"),
        }
    }
}
