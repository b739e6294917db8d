// Hotkeyd Hotplug Watcher
// inotify-based discovery of newly created event device nodes

use std::ffi::CString;
use std::mem::size_of;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use super::poller::{EventLoopError, EventLoopResult};
use crate::device::{ProbeError, ProbedDevice};

/// Filename prefix of event device nodes
pub const EVDEV_PREFIX: &str = "event";

/// Longest node path accepted, matching the fixed-size path buffers
/// historically used for event nodes
pub const MAX_NODE_PATH: usize = 31;

const HEADER_SIZE: usize = size_of::<libc::inotify_event>();
const READ_BUFFER_SIZE: usize = 4096;

/// One decoded inotify record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub mask: u32,
    /// None for records that carry no file name
    pub name: Option<String>,
}

/// Decode the complete inotify records in `buf`; a trailing partial record
/// is ignored.
pub fn parse_notifications(buf: &[u8]) -> Vec<Notification> {
    let mut out = Vec::new();
    let mut offset = 0;

    while offset + HEADER_SIZE <= buf.len() {
        let header = &buf[offset..offset + HEADER_SIZE];
        // struct inotify_event { int wd; uint32_t mask, cookie, len; char name[]; }
        let mask = u32::from_ne_bytes([header[4], header[5], header[6], header[7]]);
        let len = u32::from_ne_bytes([header[12], header[13], header[14], header[15]]) as usize;

        let name_start = offset + HEADER_SIZE;
        let Some(raw_name) = buf.get(name_start..name_start + len) else {
            log::debug!("inotify: truncated record");
            break;
        };

        let name_bytes = raw_name.split(|b| *b == 0).next().unwrap_or_default();
        let name = (!name_bytes.is_empty()).then(|| String::from_utf8_lossy(name_bytes).into_owned());

        out.push(Notification { mask, name });
        offset = name_start + len;
    }

    out
}

/// Open an event node for classification.
///
/// A node that vanished between notification and open is skipped
/// silently; other failures are logged.
pub fn open_node(path: &Path) -> Option<ProbedDevice> {
    match ProbedDevice::open(path) {
        Ok(probed) => Some(probed),
        Err(ProbeError::Vanished) => None,
        Err(e) => {
            log::warn!("{}", e);
            None
        }
    }
}

/// Watches the event device directory for created nodes.
#[derive(Debug)]
pub struct HotplugWatcher {
    dir: PathBuf,
    /// Raw inotify descriptor; the owning handle lives in the registry.
    /// None once the descriptor was lost.
    fd: Option<RawFd>,
}

impl HotplugWatcher {
    /// Start watching `dir` for file creation.
    ///
    /// Returns the watcher and the owned inotify descriptor, which the
    /// caller registers like any other device.
    pub fn init(dir: impl Into<PathBuf>) -> EventLoopResult<(Self, OwnedFd)> {
        let dir = dir.into();

        let raw = unsafe { libc::inotify_init1(libc::IN_NONBLOCK | libc::IN_CLOEXEC) };
        if raw < 0 {
            return Err(EventLoopError::Watcher(format!(
                "Failed to initialize inotify: {}",
                std::io::Error::last_os_error()
            )));
        }
        // SAFETY: inotify_init1 just returned this descriptor and nothing else owns it
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let c_dir = CString::new(dir.as_os_str().as_bytes())
            .map_err(|e| EventLoopError::Watcher(e.to_string()))?;
        let wd = unsafe {
            libc::inotify_add_watch(raw, c_dir.as_ptr(), libc::IN_CREATE | libc::IN_ONLYDIR)
        };
        if wd < 0 {
            return Err(EventLoopError::Watcher(format!(
                "Failed to add inotify watch for {}: {}",
                dir.display(),
                std::io::Error::last_os_error()
            )));
        }

        Ok((Self { dir, fd: Some(raw) }, fd))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn fd(&self) -> Option<RawFd> {
        self.fd
    }

    pub fn is_watcher_fd(&self, fd: RawFd) -> bool {
        self.fd == Some(fd)
    }

    /// Forget the descriptor; hot-plug discovery stays off afterwards
    pub fn mark_lost(&mut self) {
        self.fd = None;
    }

    pub fn is_lost(&self) -> bool {
        self.fd.is_none()
    }

    /// Full node path for a notified name, if it is an event device
    pub fn candidate_path(&self, name: &str) -> Option<PathBuf> {
        log::debug!("Found new event device {}/{}", self.dir.display(), name);

        if !name.starts_with(EVDEV_PREFIX) {
            log::debug!("Discarding {}/{}", self.dir.display(), name);
            return None;
        }

        let path = self.dir.join(name);
        if path.as_os_str().len() > MAX_NODE_PATH {
            log::debug!("Discarding {}: path too long", path.display());
            return None;
        }
        Some(path)
    }

    /// Candidate paths from one batch of notifications
    pub fn candidates(&self, notifications: &[Notification]) -> Vec<PathBuf> {
        notifications
            .iter()
            .filter_map(|n| match &n.name {
                Some(name) => self.candidate_path(name),
                None => {
                    log::debug!("inotify event with no name");
                    None
                }
            })
            .collect()
    }

    /// Read one batch of notifications and return the candidate node paths
    pub fn read_candidates(&mut self) -> Vec<PathBuf> {
        let Some(fd) = self.fd else {
            return Vec::new();
        };

        let mut buf = [0u8; READ_BUFFER_SIZE];
        let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            log::debug!("inotify read failed: {}", std::io::Error::last_os_error());
            return Vec::new();
        }

        self.candidates(&parse_notifications(&buf[..n as usize]))
    }
}
