use parking_lot::Mutex;
use std::io::{self, BufRead, BufReader, ErrorKind, Read};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::pipeline::MetadataPipeline;
use crate::source::StreamSource;

/// Retry and polling intervals for the reader loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderTiming {
    /// How often to check for a missing source
    pub source_poll: Duration,
    /// Pause after a read that returned no data
    pub idle_poll: Duration,
    /// Pause after an I/O error before re-attaching
    pub error_backoff: Duration,
}

impl Default for ReaderTiming {
    fn default() -> Self {
        Self {
            source_poll: Duration::from_secs(1),
            idle_poll: Duration::from_millis(100),
            error_backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    WaitingForSource,
    Attached,
}

const STOP_TIMEOUT: Duration = Duration::from_secs(2);
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Background thread that keeps a metadata stream attached and parsed
pub struct MetadataReader {
    cancel: CancelToken,
    source: Arc<dyn StreamSource>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl MetadataReader {
    /// Spawn the reader thread. It runs until `stop` is called or the handle is dropped.
    pub fn spawn(
        source: Arc<dyn StreamSource>,
        pipeline: MetadataPipeline,
        timing: ReaderTiming,
    ) -> io::Result<Self> {
        let cancel = CancelToken::new();
        log::info!("Metadata reader starting. Source: {}", source.describe());

        let handle = {
            let source = source.clone();
            let cancel = cancel.clone();
            thread::Builder::new()
                .name("metadata-reader".to_string())
                .spawn(move || run(source.as_ref(), pipeline, timing, &cancel))?
        };

        Ok(Self {
            cancel,
            source,
            thread: Mutex::new(Some(handle)),
        })
    }

    /// A token that stops this reader when cancelled
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }

    /// Cancel the loop and wait briefly for the thread to exit.
    ///
    /// Returns `false` if the thread was still blocked after the timeout; it is
    /// then left detached and exits on its own once its blocking call returns.
    pub fn stop(&self) -> bool {
        let Some(handle) = self.thread.lock().take() else {
            return true;
        };

        log::info!("Stopping metadata reader...");
        self.cancel.cancel();

        let deadline = Instant::now() + STOP_TIMEOUT;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                log::warn!(
                    "Metadata reader didn't stop after {}ms, detaching",
                    STOP_TIMEOUT.as_millis()
                );
                return false;
            }
            // The thread may only now have reached a blocking call
            self.source.wake();
            thread::sleep(STOP_CHECK_INTERVAL);
        }

        if handle.join().is_err() {
            log::error!("Metadata reader thread panicked");
        } else {
            log::info!("Metadata reader stopped");
        }
        true
    }
}

impl Drop for MetadataReader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    source: &dyn StreamSource,
    mut pipeline: MetadataPipeline,
    timing: ReaderTiming,
    cancel: &CancelToken,
) {
    let mut state = ReaderState::WaitingForSource;

    while !cancel.is_cancelled() {
        if !source.is_available() {
            log::debug!("Waiting for {}", source.describe());
            if cancel.sleep(timing.source_poll) {
                break;
            }
            continue;
        }

        let stream = match source.open() {
            Ok(stream) => stream,
            Err(e) => {
                log::warn!("Failed to open {}: {}", source.describe(), e);
                if cancel.sleep(timing.error_backoff) {
                    break;
                }
                continue;
            }
        };

        // open() may have blocked across a stop request
        if cancel.is_cancelled() {
            break;
        }

        transition(&mut state, ReaderState::Attached, source);
        pipeline.reset();

        let result = pump(stream, &mut pipeline, timing, cancel);
        transition(&mut state, ReaderState::WaitingForSource, source);

        match result {
            Ok(()) => break,
            Err(e) => {
                log::warn!("Metadata listener error on {}: {}", source.describe(), e);
                if cancel.sleep(timing.error_backoff) {
                    break;
                }
            }
        }
    }

    log::info!("Metadata reader loop exited");
}

/// Feed complete lines to the pipeline until cancelled (`Ok`) or the stream fails (`Err`).
/// The handle is dropped on return.
fn pump(
    stream: Box<dyn Read + Send>,
    pipeline: &mut MetadataPipeline,
    timing: ReaderTiming,
    cancel: &CancelToken,
) -> io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();

    while !cancel.is_cancelled() {
        match reader.read_until(b'\n', &mut line) {
            // No data right now; a pipe with no writer reads as empty, not closed
            Ok(0) => {
                // The writer finished without a trailing newline
                if !line.is_empty() {
                    pipeline.push_line(&String::from_utf8_lossy(&line));
                    line.clear();
                }
                if cancel.sleep(timing.idle_poll) {
                    break;
                }
            }
            Ok(_) => {
                // Hold partial lines until their newline arrives
                if line.ends_with(b"\n") {
                    pipeline.push_line(&String::from_utf8_lossy(&line));
                    line.clear();
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

fn transition(state: &mut ReaderState, next: ReaderState, source: &dyn StreamSource) {
    if *state != next {
        match next {
            ReaderState::Attached => log::info!("Attached to {}", source.describe()),
            ReaderState::WaitingForSource => log::info!("Detached from {}", source.describe()),
        }
        *state = next;
    }
}
