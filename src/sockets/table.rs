use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use libc::pid_t;
use log::trace;
use parking_lot::RwLock;

/// (source port, destination port) as seen on the wire.
pub type Ports = (u16, u16);

/// Port-pair to owning process table, published whole by the connection
/// collector and read through snapshots by capture threads.
#[derive(Debug, Default)]
pub struct Correlation {
    current: RwLock<Arc<Snapshot>>,
    gen:     AtomicU64,
}

#[derive(Debug, Default)]
pub struct Snapshot {
    map: HashMap<Ports, Entry>,
    gen: u64,
}

#[derive(Copy, Clone, Debug)]
struct Entry {
    pid:  pid_t,
    seen: Instant,
}

/// A capture thread's read-only handle, refreshed when a new table is published.
pub struct View {
    shared: Arc<Correlation>,
    snap:   Arc<Snapshot>,
}

impl Correlation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    pub fn generation(&self) -> u64 {
        self.gen.load(Ordering::Acquire)
    }

    pub fn view(self: &Arc<Self>) -> View {
        View {
            shared: self.clone(),
            snap:   self.snapshot(),
        }
    }

    /// Merge this cycle's (local port, remote port, pid) triples over the
    /// current table, dropping entries not seen within `ttl`, and swap the
    /// result in.
    pub fn publish<I>(&self, conns: I, now: Instant, ttl: Duration)
    where
        I: IntoIterator<Item = (u16, u16, pid_t)>,
    {
        let prev = self.snapshot();

        let mut map = prev.map.iter().filter(|(_, e)| {
            now.saturating_duration_since(e.seen) < ttl
        }).map(|(k, e)| (*k, *e)).collect::<HashMap<_, _>>();

        let stale = prev.map.len() - map.len();

        for (local, remote, pid) in conns {
            let entry = Entry { pid, seen: now };
            map.insert((local, remote), entry);
            map.insert((remote, local), entry);
        }

        let gen  = prev.gen + 1;
        let snap = Arc::new(Snapshot { map, gen });

        trace!("correlation table {}: {} pairs, {} stale", gen, snap.len(), stale);

        *self.current.write() = snap;
        self.gen.store(gen, Ordering::Release);
    }
}

impl Snapshot {
    pub fn get(&self, ports: Ports) -> Option<pid_t> {
        self.map.get(&ports).map(|e| e.pid)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

impl View {
    pub fn refresh(&mut self) {
        if self.shared.generation() != self.snap.gen {
            self.snap = self.shared.snapshot();
        }
    }

    pub fn get(&self, ports: Ports) -> Option<pid_t> {
        self.snap.get(ports)
    }
}
