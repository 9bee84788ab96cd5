//! Protected control channel
//!
//! Every execution temporarily points descriptors 1 and 2 at capture files.
//! MCP frames and log lines must never land there, so at startup the process
//! keeps private duplicates of the original stdout and stderr and routes the
//! transport and the logger through those instead of the numbered descriptors.

use std::fs::File;
use std::io;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

pub struct ControlChannel {
    stdout: OwnedFd,
    stderr: OwnedFd,
}

impl ControlChannel {
    /// Duplicate descriptors 1 and 2. Must run before the first execution.
    pub fn protect() -> io::Result<Self> {
        Ok(Self {
            stdout: duplicate(io::stdout().as_fd())?,
            stderr: duplicate(io::stderr().as_fd())?,
        })
    }

    /// Async writer for protocol frames.
    pub fn transport_writer(&self) -> io::Result<tokio::fs::File> {
        let file = File::from(self.stdout.try_clone()?);
        Ok(tokio::fs::File::from_std(file))
    }

    /// Blocking writer for log output.
    pub fn log_writer(&self) -> io::Result<File> {
        Ok(File::from(self.stderr.try_clone()?))
    }
}

/// Close-on-exec duplicate of `fd` that later `dup2` calls onto `fd` leave alone.
fn duplicate(fd: BorrowedFd<'_>) -> io::Result<OwnedFd> {
    fd.try_clone_to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom, Write};
    use nix::unistd::dup2;
    use std::os::fd::AsRawFd;

    fn contents(file: &mut File) -> String {
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut text = String::new();
        file.read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn test_duplicate_keeps_original_target_after_redirect() {
        let original = tempfile::tempfile().unwrap();
        let mut witness = original.try_clone().unwrap();
        let mut capture = tempfile::tempfile().unwrap();

        let mut protected = File::from(duplicate(original.as_fd()).unwrap());
        dup2(capture.as_raw_fd(), original.as_raw_fd()).unwrap();

        write!(protected, "frame").unwrap();
        protected.flush().unwrap();

        assert_eq!(contents(&mut witness), "frame");
        assert_eq!(contents(&mut capture), "");
    }

    #[test]
    fn test_protect_yields_private_descriptors() {
        let channel = ControlChannel::protect().unwrap();
        let log = channel.log_writer().unwrap();
        let transport = channel.transport_writer().unwrap();
        assert!(log.as_raw_fd() > 2);
        assert!(transport.as_raw_fd() > 2);
    }
}
