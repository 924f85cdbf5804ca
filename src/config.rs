//! Command line and environment configuration

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::session::SessionSettings;

/// Spotify playback controller with an HTTP remote and a serial LED display
#[derive(Parser, Debug, Clone)]
#[command(name = "sponos", version, about)]
pub struct Config {
    /// Port the HTTP remote listens on
    #[arg(long, env = "SPONOS_PORT", default_value_t = 8888)]
    pub port: u16,

    /// Address the HTTP remote binds to
    #[arg(long, env = "SPONOS_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Serial device of the LED display, e.g. /dev/ttyAMA0. Messages are discarded when unset.
    #[arg(long, env = "SPONOS_DISPLAY")]
    pub display_device: Option<PathBuf>,

    #[arg(long, env = "SPONOS_DISPLAY_BAUD", default_value_t = 9600)]
    pub display_baud: u32,

    /// Scroll speed sent to the display when it is opened
    #[arg(long, env = "SPONOS_DISPLAY_SPEED", default_value_t = 40)]
    pub display_speed: u8,

    /// Appended to every display message to separate scrolling text
    #[arg(long, env = "SPONOS_DISPLAY_TRAILER", default_value = "  ")]
    pub display_trailer: String,

    /// Seconds to wait for login and logout to complete
    #[arg(long, env = "SPONOS_SESSION_TIMEOUT", default_value_t = 30)]
    pub session_timeout_secs: u64,

    /// Streaming bitrate in kbps (96, 160 or 320)
    #[arg(long, env = "SPONOS_BITRATE", default_value_t = 320)]
    pub bitrate: u16,

    /// Name the player announces itself with
    #[arg(long, env = "SPONOS_DEVICE_NAME", default_value = "sponos")]
    pub device_name: String,

    /// librespot credential and audio cache
    #[arg(long, env = "SPONOS_CACHE_DIR", default_value = ".cache")]
    pub cache_dir: PathBuf,

    /// Seconds between checks of subscribed playlists
    #[arg(long, env = "SPONOS_PLAYLIST_POLL", default_value_t = 30)]
    pub playlist_poll_secs: u64,

    #[arg(long, env = "SPONOS_LOG_DIR", default_value = ".logs")]
    pub log_dir: PathBuf,
}

impl Config {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            device_name: self.device_name.clone(),
            bitrate_kbps: self.bitrate,
            cache_dir: self.cache_dir.clone(),
            playlist_poll: Duration::from_secs(self.playlist_poll_secs.max(1)),
        }
    }
}
