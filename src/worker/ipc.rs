//! Result transport between a worker and the coordinator.
//!
//! Each worker owns one [`ResultChannel`] that carries exactly one
//! [`Extent`] from the child to the parent. Two transports share the
//! contract:
//!
//! - [`PipeChannel`]: an anonymous pipe created before fork. The worker
//!   writes 8 bytes (two native-endian `i32`), the coordinator polls the
//!   read end with a zero timeout before every read.
//! - [`FileChannel`]: `min_max_<index>.txt` in a result directory. The
//!   worker overwrites it with `"<min> <max>"`, the coordinator parses it
//!   once and unlinks it.

use crate::error::{PminmaxError, Result};
use crate::scan::Extent;
use nix::fcntl::{FcntlArg, OFlag, fcntl};
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Write};
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Size of one encoded result on the pipe transport.
pub const PIPE_RESULT_LEN: usize = 2 * std::mem::size_of::<i32>();

/// File name prefix for the file transport.
pub const RESULT_FILE_PREFIX: &str = "min_max_";

/// Which transport a run uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Pipe,
    File { dir: PathBuf },
}

impl Transport {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Pipe => TransportKind::Pipe,
            Self::File { .. } => TransportKind::File,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Pipe,
    File,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pipe => write!(f, "pipe"),
            Self::File => write!(f, "file"),
        }
    }
}

/// Why a channel produced no complete result.
#[derive(Error, Debug)]
pub enum TransportIncomplete {
    #[error("no data available")]
    NoData,

    #[error("short read: got {got} of {PIPE_RESULT_LEN} bytes")]
    Short { got: usize },

    #[error("malformed result {0:?}")]
    Malformed(String),

    #[error("result already consumed")]
    AlreadyRead,

    #[error("{0}")]
    Io(#[from] io::Error),
}

/// One-shot result channel between a worker and the coordinator.
///
/// Worker side: [`enter_worker`](Self::enter_worker) then
/// [`write_result`](Self::write_result). Coordinator side:
/// [`release_writer`](Self::release_writer) after the fork loop, then at
/// most one [`read_result`](Self::read_result). Dropping the channel in
/// the coordinator closes or unlinks whatever is left.
pub trait ResultChannel {
    fn kind(&self) -> TransportKind;

    /// Drop the coordinator-only half inside the forked worker.
    fn enter_worker(&mut self);

    /// Publish the worker's extent. Consumes the write half.
    fn write_result(&mut self, extent: Extent) -> io::Result<()>;

    /// Close the coordinator's copy of the write half.
    fn release_writer(&mut self);

    /// Close every descriptor held without touching the filesystem.
    ///
    /// Used in a worker for channels that belong to its siblings.
    fn detach(&mut self);

    /// Take the result without blocking.
    fn read_result(&mut self) -> std::result::Result<Extent, TransportIncomplete>;
}

/// Open a channel for worker `index` on the given transport.
pub fn open_channel(transport: &Transport, index: u32) -> Result<Box<dyn ResultChannel>> {
    match transport {
        Transport::Pipe => Ok(Box::new(PipeChannel::create()?)),
        Transport::File { dir } => Ok(Box::new(FileChannel::create(dir, index)?)),
    }
}

/// A file descriptor wrapper that implements Read/Write with EINTR handling.
pub struct PipeFd {
    fd: OwnedFd,
}

impl PipeFd {
    pub fn new(fd: OwnedFd) -> Self {
        Self { fd }
    }

    /// Whether a read would return immediately (data or end-of-stream).
    fn is_readable(&self) -> io::Result<bool> {
        let mut fds = [PollFd::new(self.fd.as_fd(), PollFlags::POLLIN)];
        loop {
            match poll(&mut fds, PollTimeout::ZERO) {
                Ok(0) => return Ok(false),
                Ok(_) => {
                    let revents = fds[0].revents().unwrap_or(PollFlags::empty());
                    return Ok(revents
                        .intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR));
                }
                Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => return Err(io::Error::from_raw_os_error(e as i32)),
            }
        }
    }
}

impl AsFd for PipeFd {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for PipeFd {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl Read for PipeFd {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match nix::unistd::read(&self.fd, buf) {
                Ok(n) => return Ok(n),
                Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => return Err(io::Error::from_raw_os_error(e as i32)),
            }
        }
    }
}

impl Write for PipeFd {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        loop {
            match nix::unistd::write(&self.fd, buf) {
                Ok(n) => return Ok(n),
                Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => return Err(io::Error::from_raw_os_error(e as i32)),
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Encode an extent for the pipe transport.
pub fn encode_extent(extent: Extent) -> [u8; PIPE_RESULT_LEN] {
    let mut buf = [0u8; PIPE_RESULT_LEN];
    buf[..4].copy_from_slice(&extent.min.to_ne_bytes());
    buf[4..].copy_from_slice(&extent.max.to_ne_bytes());
    buf
}

/// Decode an extent written by [`encode_extent`].
pub fn decode_extent(buf: &[u8; PIPE_RESULT_LEN]) -> Extent {
    let [a, b, c, d, e, f, g, h] = *buf;
    Extent {
        min: i32::from_ne_bytes([a, b, c, d]),
        max: i32::from_ne_bytes([e, f, g, h]),
    }
}

/// Anonymous pipe transport.
pub struct PipeChannel {
    reader: Option<PipeFd>,
    writer: Option<PipeFd>,
}

impl PipeChannel {
    /// Create the pipe. Both ends exist before fork so the worker inherits them.
    ///
    /// The read end is non-blocking; only the coordinator reads it.
    pub fn create() -> Result<Self> {
        let (read_fd, write_fd) =
            nix::unistd::pipe().map_err(|e| PminmaxError::Pipe(e.to_string()))?;
        fcntl(&read_fd, FcntlArg::F_SETFL(OFlag::O_NONBLOCK))
            .map_err(|e| PminmaxError::Pipe(e.to_string()))?;
        Ok(Self {
            reader: Some(PipeFd::new(read_fd)),
            writer: Some(PipeFd::new(write_fd)),
        })
    }
}

impl ResultChannel for PipeChannel {
    fn kind(&self) -> TransportKind {
        TransportKind::Pipe
    }

    fn enter_worker(&mut self) {
        self.reader = None;
    }

    fn write_result(&mut self, extent: Extent) -> io::Result<()> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "write end already closed"))?;
        writer.write_all(&encode_extent(extent))
    }

    fn release_writer(&mut self) {
        self.writer = None;
    }

    fn detach(&mut self) {
        self.reader = None;
        self.writer = None;
    }

    fn read_result(&mut self) -> std::result::Result<Extent, TransportIncomplete> {
        let mut reader = self.reader.take().ok_or(TransportIncomplete::AlreadyRead)?;

        let mut buf = [0u8; PIPE_RESULT_LEN];
        let mut got = 0;
        while got < PIPE_RESULT_LEN {
            if !reader.is_readable()? {
                return Err(if got == 0 {
                    TransportIncomplete::NoData
                } else {
                    TransportIncomplete::Short { got }
                });
            }
            let n = match reader.read(&mut buf[got..]) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => 0,
                Err(e) => return Err(e.into()),
            };
            match n {
                0 if got == 0 => return Err(TransportIncomplete::NoData),
                0 => return Err(TransportIncomplete::Short { got }),
                n => got += n,
            }
        }
        Ok(decode_extent(&buf))
    }
}

/// Path of the result file for worker `index` under `dir`.
pub fn result_file_path(dir: &Path, index: u32) -> PathBuf {
    dir.join(format!("{}{}.txt", RESULT_FILE_PREFIX, index))
}

/// Named temporary file transport.
pub struct FileChannel {
    path: PathBuf,
    removed: bool,
}

impl FileChannel {
    /// Clear any stale file and create an empty one for this worker.
    pub fn create(dir: &Path, index: u32) -> Result<Self> {
        let path = result_file_path(dir, index);
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed stale result file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(PminmaxError::ResultFile { path, source }),
        }
        if let Err(source) = File::create(&path) {
            return Err(PminmaxError::ResultFile { path, source });
        }
        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        if let Err(e) = fs::remove_file(&self.path)
            && e.kind() != io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove result file");
        }
    }
}

/// Parse the `"<min> <max>"` file body.
pub fn parse_extent(text: &str) -> Option<Extent> {
    let mut parts = text.split_whitespace();
    let min = parts.next()?.parse().ok()?;
    let max = parts.next()?.parse().ok()?;
    Some(Extent { min, max })
}

impl ResultChannel for FileChannel {
    fn kind(&self) -> TransportKind {
        TransportKind::File
    }

    fn enter_worker(&mut self) {}

    fn write_result(&mut self, extent: Extent) -> io::Result<()> {
        // Formatted on the stack: the worker runs in a forked child.
        let mut buf = Cursor::new([0u8; 32]);
        write!(buf, "{} {}", extent.min, extent.max)?;
        let len = buf.position() as usize;

        let mut file = File::create(&self.path)?;
        file.write_all(&buf.get_ref()[..len])
    }

    fn release_writer(&mut self) {}

    fn detach(&mut self) {}

    fn read_result(&mut self) -> std::result::Result<Extent, TransportIncomplete> {
        if self.removed {
            return Err(TransportIncomplete::AlreadyRead);
        }
        let text = fs::read_to_string(&self.path);
        self.remove();

        let text = text?;
        if text.trim().is_empty() {
            return Err(TransportIncomplete::NoData);
        }
        parse_extent(&text).ok_or(TransportIncomplete::Malformed(text))
    }
}

impl Drop for FileChannel {
    fn drop(&mut self) {
        self.remove();
    }
}
