//! Single-threaded reactor hosting inject callbacks.
//!
//! Built directly on the `tokio` runtime and `task::spawn`/`spawn_local`,
//! but gives the "run a callback on the owning loop" primitive its own name,
//! since several components (background commands, sticker cleanup, prefetch)
//! need to hand a result back to code that expects exclusive access to
//! `Instance`/`Partition` state.
//!
//! Concretely: one `EventLoop` owns an mpsc channel of boxed `FnOnce`
//! closures. `run()` drains the channel on a single task, in FIFO order, so
//! injected callbacks run in the order they were posted and always after the
//! callback that posted them returns.

use std::fmt;

use tokio::sync::mpsc;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Any-task handle used to post a one-shot callback onto the loop thread.
#[derive(Clone)]
pub struct InjectHandle {
    tx: mpsc::UnboundedSender<Job>,
}

impl fmt::Debug for InjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectHandle").finish_non_exhaustive()
    }
}

impl InjectHandle {
    /// Schedule `job` to run on the owning `EventLoop`'s thread. Safe to call
    /// from any task, including ones spawned on other worker threads. A
    /// closed loop (already shut down) silently drops the job, matching the
    /// spec's "the loop itself never aborts" framing — there is simply no one
    /// left to run it.
    pub fn inject(&self, job: impl FnOnce() + Send + 'static) {
        let _ = self.tx.send(Box::new(job));
    }
}

pub struct EventLoop {
    tx: mpsc::UnboundedSender<Job>,
    rx: mpsc::UnboundedReceiver<Job>,
}

impl EventLoop {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn handle(&self) -> InjectHandle {
        InjectHandle { tx: self.tx.clone() }
    }

    /// Runs until every `InjectHandle` (and the loop's own retained sender)
    /// has been dropped. Callers that want a persistent loop should keep a
    /// handle around; callers driving a short batch of injects (tests) can
    /// just drop their handles and let `run` return.
    pub async fn run(mut self) {
        drop(self.tx);
        while let Some(job) = self.rx.recv().await {
            job();
        }
    }

    /// Process whatever is currently queued without blocking for more. Used
    /// by components that drive their own completion signalling loop
    /// alongside other `select!` branches instead of a dedicated `run` task.
    pub fn drain_ready(&mut self) {
        while let Ok(job) = self.rx.try_recv() {
            job();
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn injects_run_in_fifo_order() {
        let event_loop = EventLoop::new();
        let handle = event_loop.handle();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        for i in 0..5 {
            let order = Arc::clone(&order);
            handle.inject(move || order.lock().unwrap().push(i));
        }
        drop(handle);
        event_loop.run().await;
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn inject_from_spawned_task_is_delivered() {
        let event_loop = EventLoop::new();
        let handle = event_loop.handle();
        let counter = Arc::new(AtomicU32::new(0));
        let counter2 = Arc::clone(&counter);
        let worker_handle = handle.clone();
        tokio::spawn(async move {
            worker_handle.inject(move || {
                counter2.fetch_add(1, Ordering::SeqCst);
            });
        })
        .await
        .unwrap();
        drop(handle);
        event_loop.run().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
