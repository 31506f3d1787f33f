use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

/// Something the reader can attach to and read metadata bytes from
pub trait StreamSource: Send + Sync {
    /// Whether `open` is worth attempting right now
    fn is_available(&self) -> bool;

    /// Open a fresh handle. May block until a writer shows up.
    fn open(&self) -> io::Result<Box<dyn Read + Send>>;

    /// Human-readable name for logs
    fn describe(&self) -> String;

    /// Unblock a reader parked in `open` or `read` so it can notice shutdown
    fn wake(&self) {}
}

/// A named pipe (or any readable file) on the local filesystem
#[derive(Debug, Clone)]
pub struct PathSource {
    path: PathBuf,
}

impl PathSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StreamSource for PathSource {
    fn is_available(&self) -> bool {
        self.path.exists()
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(&self.path)?))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    #[cfg(unix)]
    fn wake(&self) {
        use nix::fcntl::OFlag;
        use std::fs::OpenOptions;
        use std::io::Write;
        use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};

        let is_fifo = std::fs::metadata(&self.path)
            .map(|m| m.file_type().is_fifo())
            .unwrap_or(false);
        if !is_fifo {
            return;
        }

        // Opening the write end releases a blocked open(); the empty line
        // releases a blocked read and is discarded by the frame assembler.
        match OpenOptions::new()
            .write(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(&self.path)
        {
            Ok(mut pipe) => {
                let _ = pipe.write_all(b"\n");
            }
            Err(e) => log::debug!("No reader to wake on {:?}: {}", self.path, e),
        }
    }
}
