use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A single timer role (reconnect, heartbeat, background grace) or long-lived
/// listener task.
///
/// At most one task is armed per slot; arming again aborts the previous task first.
#[derive(Default)]
pub struct TimerSlot {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl TimerSlot {
    pub fn new(name: &'static str) -> Self {
        Self { name, handle: None }
    }

    /// Runs `on_fire` once after `delay`, replacing any pending timer in this slot
    pub fn arm_once<F>(&mut self, delay: Duration, on_fire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        tracing::debug!("Arming {} timer for {:?}", self.name, delay);
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire.await;
        }));
    }

    /// Spawns an arbitrary task (e.g. a recurring loop) into this slot
    pub fn arm_task<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        tracing::debug!("Starting {} task", self.name);
        self.handle = Some(tokio::spawn(task));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Cancelled {} timer", self.name);
        }
    }

    /// Forget the handle without aborting it. Called from inside the timer's own
    /// task once it has fired, so that later re-arming cannot abort the caller.
    pub fn release(&mut self) {
        self.handle = None;
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
