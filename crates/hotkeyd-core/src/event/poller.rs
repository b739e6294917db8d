// Hotkeyd Readiness Multiplexing
// Thin epoll wrapper reporting ready and faulted descriptors

use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use smallvec::SmallVec;

/// Maximum ready descriptors reported per wait
pub const MAX_EPOLL_EVENTS: usize = 8;

/// Result type for event loop operations
pub type EventLoopResult<T> = Result<T, EventLoopError>;

/// Errors that can occur in the event loop
#[derive(Debug, thiserror::Error)]
pub enum EventLoopError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("epoll error: {0}")]
    Poller(String),

    #[error("hotplug watcher error: {0}")]
    Watcher(String),
}

/// Readiness condition reported for one descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Error or hang-up; the descriptor must be torn down
    Fault,
    Readable,
}

/// One descriptor reported by a wait, in kernel order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyEvent {
    pub fd: RawFd,
    pub readiness: Readiness,
}

impl ReadyEvent {
    pub fn readable(fd: RawFd) -> Self {
        Self {
            fd,
            readiness: Readiness::Readable,
        }
    }

    pub fn fault(fd: RawFd) -> Self {
        Self {
            fd,
            readiness: Readiness::Fault,
        }
    }
}

/// Ready list of one wait; never longer than `MAX_EPOLL_EVENTS`
pub type ReadyList = SmallVec<[ReadyEvent; MAX_EPOLL_EVENTS]>;

/// Level-triggered epoll instance
#[derive(Debug)]
pub struct Poller {
    epfd: OwnedFd,
}

impl Poller {
    pub fn new() -> EventLoopResult<Self> {
        let fd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if fd < 0 {
            return Err(EventLoopError::Poller(format!(
                "Could not create epoll fd: {}",
                std::io::Error::last_os_error()
            )));
        }
        // SAFETY: epoll_create1 just returned this descriptor and nothing else owns it
        let epfd = unsafe { OwnedFd::from_raw_fd(fd) };
        Ok(Self { epfd })
    }

    /// Watch `fd` for input
    pub fn register(&self, fd: RawFd) -> std::io::Result<()> {
        let mut ev = libc::epoll_event {
            events: libc::EPOLLIN as u32,
            u64: fd as u64,
        };
        let ret = unsafe { libc::epoll_ctl(self.epfd.as_raw_fd(), libc::EPOLL_CTL_ADD, fd, &mut ev) };
        if ret < 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }

    /// Stop watching `fd`. Must run before the descriptor is closed.
    pub fn deregister(&self, fd: RawFd) -> std::io::Result<()> {
        let ret = unsafe {
            libc::epoll_ctl(
                self.epfd.as_raw_fd(),
                libc::EPOLL_CTL_DEL,
                fd,
                std::ptr::null_mut(),
            )
        };
        if ret < 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }

    /// Wait up to `timeout_ms` and report ready descriptors.
    ///
    /// An interrupted wait (EINTR) yields an empty list; any other failure
    /// is fatal.
    pub fn wait(&self, timeout_ms: i32) -> EventLoopResult<ReadyList> {
        let mut events = [libc::epoll_event { events: 0, u64: 0 }; MAX_EPOLL_EVENTS];

        let nfds = unsafe {
            libc::epoll_wait(
                self.epfd.as_raw_fd(),
                events.as_mut_ptr(),
                MAX_EPOLL_EVENTS as libc::c_int,
                timeout_ms,
            )
        };

        if nfds < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                return Ok(ReadyList::new());
            }
            log::error!("epoll_wait() error: {}", err);
            return Err(EventLoopError::Io(err));
        }

        let fault = (libc::EPOLLERR | libc::EPOLLHUP) as u32;
        let readable = libc::EPOLLIN as u32;

        Ok(events[..nfds as usize]
            .iter()
            .filter_map(|ev| {
                let fd = ev.u64 as RawFd;
                // Copy out of the packed struct before testing bits
                let flags = ev.events;
                if flags & fault != 0 {
                    Some(ReadyEvent::fault(fd))
                } else if flags & readable != 0 {
                    Some(ReadyEvent::readable(fd))
                } else {
                    None
                }
            })
            .collect())
    }
}
