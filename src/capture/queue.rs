use std::mem;
use std::sync::Arc;
use std::time::Duration;
use libc::pid_t;
use log::{debug, warn};
use crate::clock::Timestamp;
use crate::store::{PacketRecord, Store};
use super::Frame;

/// Batches packet records of one link and flushes them to the store at
/// most once per interval of capture time.
pub struct Queue {
    link:  Arc<String>,
    queue: Vec<PacketRecord>,
    store: Option<Arc<Store>>,
    delay: Duration,
    next:  Timestamp,
}

impl Queue {
    pub fn new(link: Arc<String>, store: Option<Arc<Store>>, delay: Duration) -> Self {
        Self {
            link:  link,
            queue: Vec::new(),
            store: store,
            delay: delay,
            next:  Timestamp::zero(),
        }
    }

    pub fn record(&mut self, frame: &Frame, pid: Option<pid_t>) {
        if self.store.is_none() {
            return;
        }

        self.queue.push(PacketRecord {
            interface_name:      self.link.to_string(),
            source_address:      frame.src.ip(),
            destination_address: frame.dst.ip(),
            length:              frame.bytes,
            captured_at:         frame.timestamp,
            owning_pid:          pid,
        });
    }

    pub fn export(&mut self, ts: Timestamp) {
        if self.next <= ts {
            self.next = ts + self.delay;
            self.flush();
        }
    }

    pub fn flush(&mut self) {
        let store = match &self.store {
            Some(store) if !self.queue.is_empty() => store,
            _                                     => return,
        };

        let records = mem::take(&mut self.queue);
        let count   = records.len();

        match store.append(records) {
            Ok(()) => debug!("{} stored {} packets", self.link, count),
            Err(e) => warn!("{} packets dropped: {}", self.link, e),
        }
    }
}
