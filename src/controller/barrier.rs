//! Resettable one-shot signal used to wait for session completions

use std::time::Duration;

use tokio::sync::watch;

pub struct Barrier {
    state: watch::Sender<bool>,
}

impl Barrier {
    pub fn new(signaled: bool) -> Self {
        Self {
            state: watch::Sender::new(signaled),
        }
    }

    /// Release current and future waiters until the next `clear`
    pub fn signal(&self) {
        self.state.send_replace(true);
    }

    pub fn clear(&self) {
        self.state.send_replace(false);
    }

    /// Wait until signaled; `false` if `timeout` elapsed first
    pub async fn wait(&self, timeout: Duration) -> bool {
        let mut signaled = self.state.subscribe();
        matches!(
            tokio::time::timeout(timeout, signaled.wait_for(|set| *set)).await,
            Ok(Ok(_))
        )
    }
}
