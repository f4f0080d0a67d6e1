use std::net::SocketAddr;
use libc::pid_t;
use crate::store::Status;

/// Cumulative byte counters of one interface.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Counters {
    pub sent: u64,
    pub recv: u64,
}

/// One row of the OS connection table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Socket {
    pub local:  SocketAddr,
    pub remote: Option<SocketAddr>,
    pub pid:    Option<pid_t>,
    pub status: Status,
}

pub use os::{connections, counters};

#[cfg(target_os = "linux")]
#[path = "linux.rs"]
mod os;

#[cfg(not(target_os = "linux"))]
#[path = "empty.rs"]
mod os;
