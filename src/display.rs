//! Serial LED display writer
//!
//! Display text is queued from any thread and written to the serial line by
//! one dedicated worker thread. The Pi-Lite board only accepts 14 bytes per
//! write, so every message goes out in 14-byte chunks.

use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};

/// Bytes the display accepts per write
pub const CHUNK_SIZE: usize = 14;

/// Sent once when the port opens; sets the scroll speed
fn speed_command(speed: u8) -> String {
    format!("$$$SPEED{}\r", speed)
}

/// Open the display's serial port and configure its scroll speed
pub fn open_serial(
    path: &Path,
    baud_rate: u32,
    scroll_speed: u8,
) -> Result<Box<dyn serialport::SerialPort>> {
    let path_str = path.to_string_lossy();
    let mut port = serialport::new(path_str.as_ref(), baud_rate)
        .timeout(Duration::from_millis(500))
        .open()
        .with_context(|| format!("cannot open display port {}", path_str))?;

    port.write_all(speed_command(scroll_speed).as_bytes())
        .context("cannot configure display scroll speed")?;

    tracing::info!(port = %path_str, baud_rate, scroll_speed, "Display port opened");
    Ok(port)
}

/// Count of messages enqueued but not yet written
#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    drained: Condvar,
}

impl Pending {
    fn add(&self) {
        if let Ok(mut count) = self.count.lock() {
            *count += 1;
        }
    }

    fn done(&self) {
        if let Ok(mut count) = self.count.lock() {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.drained.notify_all();
            }
        }
    }
}

/// Producer side of the display queue; cheap to clone
#[derive(Clone)]
pub struct DisplayHandle {
    sender: Sender<String>,
    pending: Arc<Pending>,
}

impl DisplayHandle {
    /// Queue `text` for the display without blocking
    pub fn enqueue(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::debug!(message = %text, "Display message queued");
        self.pending.add();
        if self.sender.send(text).is_err() {
            tracing::warn!("Display worker is gone, message dropped");
            self.pending.done();
        }
    }

    /// Block until every queued message is written or `timeout` elapses.
    /// Returns whether the queue drained.
    pub fn drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let Ok(mut count) = self.pending.count.lock() else {
            return false;
        };
        while *count > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.pending.drained.wait_timeout(count, remaining) {
                Ok((guard, _)) => count = guard,
                Err(_) => return false,
            }
        }
        true
    }
}

/// Start the `display-writer` worker on `sink` and return its producer handle.
///
/// `trailer` is appended to every message so scrolled messages stay apart
/// on the board. The worker exits once every handle is dropped.
pub fn spawn_dispatcher<W>(sink: W, trailer: impl Into<String>) -> Result<DisplayHandle>
where
    W: Write + Send + 'static,
{
    let (sender, receiver) = crossbeam_channel::unbounded();
    let pending = Arc::new(Pending::default());
    let trailer = trailer.into();

    let worker_pending = pending.clone();
    thread::Builder::new()
        .name("display-writer".to_string())
        .spawn(move || run(receiver, sink, &trailer, &worker_pending))
        .context("cannot start display worker")?;

    Ok(DisplayHandle { sender, pending })
}

fn run<W: Write>(receiver: Receiver<String>, mut sink: W, trailer: &str, pending: &Pending) {
    tracing::debug!("Display worker started");
    while let Ok(message) = receiver.recv() {
        let text = format!("{message}{trailer}");
        if let Err(e) = write(&mut sink, &text) {
            tracing::warn!(error = %e, message = %message, "Display write failed");
        }
        pending.done();
    }
    tracing::debug!("Display worker stopped");
}

/// Write `text` in consecutive `CHUNK_SIZE`-byte pieces, one write per chunk
pub fn write<W: Write + ?Sized>(sink: &mut W, text: &str) -> io::Result<()> {
    for chunk in text.as_bytes().chunks(CHUNK_SIZE) {
        sink.write_all(chunk)?;
    }
    sink.flush()
}

/// Sink that keeps every write call, shared by tests across the crate
#[cfg(test)]
pub(crate) mod recording {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct RecordingSink {
        writes: Arc<Mutex<Vec<Vec<u8>>>>,
        fail: bool,
    }

    impl Write for RecordingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
            }
            self.writes.lock().unwrap().push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl RecordingSink {
        /// Sink whose every write fails
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn lengths(&self) -> Vec<usize> {
            self.writes.lock().unwrap().iter().map(Vec::len).collect()
        }

        pub fn joined(&self) -> String {
            let bytes: Vec<u8> = self.writes.lock().unwrap().concat();
            String::from_utf8(bytes).unwrap()
        }

        /// Messages written with a `"\n"` trailer
        pub fn messages(&self) -> Vec<String> {
            self.joined().lines().map(str::to_string).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recording::RecordingSink;

    #[test]
    fn thirty_bytes_take_three_writes() {
        let mut sink = RecordingSink::default();
        write(&mut sink, "abcdefghijklmnopqrstuvwxyz0123").unwrap();
        assert_eq!(sink.lengths(), vec![14, 14, 2]);
        assert_eq!(sink.joined(), "abcdefghijklmnopqrstuvwxyz0123");
    }

    #[test]
    fn dispatcher_writes_messages_in_order() {
        let sink = RecordingSink::default();
        let handle = spawn_dispatcher(sink.clone(), "").unwrap();

        handle.enqueue("abcdefghijklmnopqrstuvwxyz0123");
        handle.enqueue("Next..");
        assert!(handle.drain(Duration::from_secs(5)));

        assert_eq!(sink.lengths(), vec![14, 14, 2, 6]);
        assert_eq!(sink.joined(), "abcdefghijklmnopqrstuvwxyz0123Next..");
    }

    #[test]
    fn trailer_is_appended_to_each_message() {
        let sink = RecordingSink::default();
        let handle = spawn_dispatcher(sink.clone(), "  ").unwrap();

        handle.enqueue("Ready..");
        handle.enqueue("Ending..");
        assert!(handle.drain(Duration::from_secs(5)));

        assert_eq!(sink.joined(), "Ready..  Ending..  ");
    }

    #[test]
    fn write_failures_do_not_stop_the_worker() {
        let sink = RecordingSink::failing();
        let handle = spawn_dispatcher(sink.clone(), "").unwrap();

        handle.enqueue("first");
        handle.enqueue("second");
        assert!(handle.drain(Duration::from_secs(5)));
        assert!(sink.lengths().is_empty());
    }

    #[test]
    fn producers_on_other_threads_share_the_queue() {
        let sink = RecordingSink::default();
        let dispatcher = spawn_dispatcher(sink.clone(), "").unwrap();

        let producers: Vec<_> = (0..4)
            .map(|i| {
                let handle = dispatcher.clone();
                thread::spawn(move || handle.enqueue(format!("message {i}")))
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        assert!(dispatcher.drain(Duration::from_secs(5)));
        let text = sink.joined();
        for i in 0..4 {
            assert!(text.contains(&format!("message {i}")));
        }
    }

    /// Sink that takes a while per write, like a slow UART
    struct SlowSink(Duration);

    impl Write for SlowSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            thread::sleep(self.0);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn drain_gives_up_after_its_timeout() {
        let handle = spawn_dispatcher(SlowSink(Duration::from_millis(100)), "").unwrap();
        handle.enqueue("Ending..");

        assert!(!handle.drain(Duration::from_millis(10)));
        assert!(handle.drain(Duration::from_secs(5)));
    }

    #[test]
    fn speed_command_matches_board_protocol() {
        assert_eq!(speed_command(40), "$$$SPEED40\r");
    }
}
