use std::collections::{HashMap, HashSet};
use libc::pid_t;
use log::trace;
use parking_lot::{Mutex, RwLock};
use pnet::util::MacAddr;
use serde::{Serialize, Deserialize};
use crate::sockets::View;
use super::{Frame, Rate};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub upload_bytes:   u64,
    pub download_bytes: u64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Upload,
    Download,
}

/// Per-process byte totals; only ever incremented.
#[derive(Debug, Default)]
pub struct Accumulator {
    map: HashMap<pid_t, Usage>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_if_absent(&mut self, pid: pid_t) -> &mut Usage {
        self.map.entry(pid).or_insert_with(Usage::default)
    }

    pub fn add(&mut self, pid: pid_t, dir: Direction, bytes: u64) {
        let usage = self.insert_if_absent(pid);
        match dir {
            Direction::Upload   => usage.upload_bytes   = usage.upload_bytes.saturating_add(bytes),
            Direction::Download => usage.download_bytes = usage.download_bytes.saturating_add(bytes),
        }
    }

    pub fn get(&self, pid: pid_t) -> Option<Usage> {
        self.map.get(&pid).copied()
    }

    pub fn snapshot(&self) -> HashMap<pid_t, Usage> {
        self.map.clone()
    }
}

/// State shared by every capture thread: the local hardware addresses and
/// the accumulated per-process traffic.
#[derive(Debug, Default)]
pub struct Traffic {
    macs:  RwLock<HashSet<MacAddr>>,
    accum: Mutex<Accumulator>,
    rates: RwLock<HashMap<pid_t, Rate>>,
}

impl Traffic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mac(&self, mac: MacAddr) {
        if mac != MacAddr::zero() {
            self.macs.write().insert(mac);
        }
    }

    pub fn is_local(&self, mac: MacAddr) -> bool {
        self.macs.read().contains(&mac)
    }

    /// Credit the frame to the process owning its port pair, if known.
    pub fn attribute(&self, view: &View, frame: &Frame) -> Option<pid_t> {
        let pid = view.get(frame.ports())?;

        let dir = match self.is_local(frame.src_mac) {
            true  => Direction::Upload,
            false => Direction::Download,
        };

        trace!("{} -> {} {:?} {} bytes for {}", frame.src, frame.dst, dir, frame.bytes, pid);

        self.accum.lock().add(pid, dir, frame.bytes as u64);

        Some(pid)
    }

    pub fn usage(&self, pid: pid_t) -> Option<Usage> {
        self.accum.lock().get(pid)
    }

    pub fn snapshot(&self) -> HashMap<pid_t, Usage> {
        self.accum.lock().snapshot()
    }

    /// Replace the rates of the last refresh interval.
    pub fn publish(&self, rates: HashMap<pid_t, Rate>) {
        *self.rates.write() = rates;
    }

    pub fn rates(&self) -> HashMap<pid_t, Rate> {
        self.rates.read().clone()
    }
}
