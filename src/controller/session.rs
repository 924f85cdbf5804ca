//! Session lifecycle: login/logout waits and user-facing feedback

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::display::DisplayHandle;
use crate::error::{Result, SponosError};
use crate::model::{ConnectionState, PlaylistSummary, SearchResults};
use crate::session::SessionClient;

use super::barrier::Barrier;
use super::queue::QueueController;

const INCORRECT_LOGIN: &str = "Incorrect login";

#[derive(Clone)]
pub struct SessionCoordinator {
    pub(crate) session: Arc<dyn SessionClient>,
    pub(crate) queue: Arc<QueueController>,
    display: DisplayHandle,
    logged_in: Arc<Barrier>,
    logged_out: Arc<Barrier>,
    timeout: Duration,
    last_state: Arc<Mutex<ConnectionState>>,
}

impl SessionCoordinator {
    pub fn new(
        session: Arc<dyn SessionClient>,
        queue: Arc<QueueController>,
        display: DisplayHandle,
        timeout: Duration,
    ) -> Self {
        let last_state = session.connection_state();
        Self {
            session,
            queue,
            display,
            logged_in: Arc::new(Barrier::new(false)),
            logged_out: Arc::new(Barrier::new(true)),
            timeout,
            last_state: Arc::new(Mutex::new(last_state)),
        }
    }

    pub fn queue(&self) -> &Arc<QueueController> {
        &self.queue
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.session.connection_state()
    }

    pub async fn display_name(&self) -> Result<String> {
        Ok(self.session.display_name().await?)
    }

    pub async fn search(&self, query: &str) -> Result<SearchResults> {
        tracing::debug!(query, "Searching the catalog");
        Ok(self.session.search(query).await?)
    }

    pub async fn user_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        Ok(self.session.user_playlists().await?)
    }

    /// Log in and wait for the session to answer
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        tracing::info!(username, "Logging in");
        self.logged_in.clear();
        self.session.login(username, password).await?;

        if !self.logged_in.wait(self.timeout).await {
            tracing::warn!(username, timeout = ?self.timeout, "Login timed out");
            return Err(SponosError::Timeout {
                operation: "login",
                waited: self.timeout,
            });
        }

        let state = self.session.connection_state();
        if state.is_usable() {
            tracing::info!(username, ?state, "Login complete");
            Ok(username.to_string())
        } else {
            tracing::warn!(username, ?state, "Login rejected");
            Err(SponosError::AuthenticationFailure(INCORRECT_LOGIN.to_string()))
        }
    }

    pub async fn logout(&self) -> Result<()> {
        if self.session.connection_state() == ConnectionState::Disconnected {
            tracing::debug!("Already logged out");
            return Ok(());
        }

        tracing::info!("Logging out");
        self.session.logout().await?;
        if !self.logged_out.wait(self.timeout).await {
            tracing::warn!(timeout = ?self.timeout, "Logout timed out");
            return Err(SponosError::Timeout {
                operation: "logout",
                waited: self.timeout,
            });
        }
        Ok(())
    }

    pub fn on_logged_in(&self, error: Option<&str>) {
        if let Some(error) = error {
            tracing::warn!(error, "Login failed");
        }
        self.logged_in.signal();
        self.logged_out.clear();
    }

    pub async fn on_logged_out(&self) {
        self.queue.reset_queue().await;
        self.queue.reset_play_idx().await;
        self.logged_in.clear();
        self.logged_out.signal();
        tracing::info!("Logged out");
    }

    pub async fn on_end_of_track(&self) {
        self.queue.on_end_of_track().await;
    }

    pub async fn on_connection_state_changed(&self, state: ConnectionState) -> Result<()> {
        let previous = {
            let mut last = self
                .last_state
                .lock()
                .map_err(|_| anyhow::anyhow!("connection state lock poisoned"))?;
            std::mem::replace(&mut *last, state)
        };
        tracing::debug!(?previous, ?state, "Connection state changed");

        if state == ConnectionState::LoggedIn && previous != ConnectionState::LoggedIn {
            let name = self.session.display_name().await?;
            self.display.enqueue(format!("Welcome {name}"));
        }
        Ok(())
    }

    pub async fn next_track(&self) -> Result<usize> {
        self.display.enqueue("Next..");
        self.queue.next().await
    }

    pub async fn prev_track(&self) -> Result<usize> {
        self.display.enqueue("Previous..");
        self.queue.prev().await
    }

    pub async fn set_volume(&self, percent: u8) {
        let percent = percent.min(100);
        self.session.set_volume(percent).await;
        self.display.enqueue(format!("Volume: {percent}%"));
        tracing::debug!(percent, "Volume set");
    }

    pub async fn volume(&self) -> u8 {
        self.session.volume().await
    }

    /// Say goodbye on the display and log out
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down session");
        self.display.enqueue("Ending..");
        self.logout().await
    }
}
