use std::sync::Arc;
use std::time::{Duration, Instant};
use log::{debug, trace};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::interval;
use crate::error::Result;
use crate::shutdown::Shutdown;
use super::{Config, Document, Filter, Page, Projection, Table};
use super::table::newest;
use super::{ConnectionSample, InterfaceSample, PacketRecord};

pub struct Store {
    interfaces:  Mutex<Table<InterfaceSample>>,
    connections: Mutex<Table<ConnectionSample>>,
    packets:     Mutex<Table<PacketRecord>>,
    limit:       usize,
}

/// Maps a document type onto its table in the store.
pub trait Stored: Document {
    fn table(store: &Store) -> &Mutex<Table<Self>>;
}

impl Store {
    pub fn new(cfg: &Config) -> Self {
        let ret = &cfg.retention;
        Self {
            interfaces:  Mutex::new(Table::new(ret.interfaces,  cfg.capacity)),
            connections: Mutex::new(Table::new(ret.connections, cfg.capacity)),
            packets:     Mutex::new(Table::new(ret.packets,     cfg.capacity)),
            limit:       cfg.limit,
        }
    }

    pub fn append<T: Stored>(&self, docs: Vec<T>) -> Result<()> {
        let count = docs.len();
        let now   = Instant::now();
        let res   = T::table(self).lock().insert(docs, now);
        trace!("appended {} {} records: {:?}", count, T::COLLECTION, res);
        res
    }

    pub fn find<T: Stored>(&self, filter: &Filter, limit: Option<usize>) -> Page<T> {
        let rows = self.snapshot::<T>();
        let hits = newest(&rows, filter, self.limit(limit));
        let data = hits.into_iter().map(|(doc, _)| T::clone(&doc)).collect();
        Page::new(data, rows.len())
    }

    pub fn query<T: Stored>(&self, filter: &Filter, fields: &Projection, limit: Option<usize>) -> Page<Value> {
        let rows = self.snapshot::<T>();
        let hits = newest(&rows, filter, self.limit(limit));
        let data = hits.into_iter().map(|(_, value)| fields.apply(value)).collect();
        Page::new(data, rows.len())
    }

    // the collection lock is held only while the live rows are collected
    fn snapshot<T: Stored>(&self) -> Vec<Arc<T>> {
        T::table(self).lock().snapshot(Instant::now())
    }

    pub fn len<T: Stored>(&self) -> usize {
        T::table(self).lock().live(Instant::now()).count()
    }

    pub fn expire(&self, now: Instant) -> usize {
        self.interfaces.lock().expire(now)
            + self.connections.lock().expire(now)
            + self.packets.lock().expire(now)
    }

    pub async fn reap(self: Arc<Self>, every: Duration, shutdown: Shutdown) {
        let mut interval = interval(every);

        loop {
            tokio::select! {
                now = interval.tick() => {
                    let count = self.expire(now.into_std());
                    if count > 0 {
                        debug!("expired {} records", count);
                    }
                },
                _ = shutdown.wait() => break,
            }
        }
    }

    fn limit(&self, limit: Option<usize>) -> usize {
        limit.map(|n| n.min(self.limit)).unwrap_or(self.limit)
    }
}

impl Stored for InterfaceSample {
    fn table(store: &Store) -> &Mutex<Table<Self>> {
        &store.interfaces
    }
}

impl Stored for ConnectionSample {
    fn table(store: &Store) -> &Mutex<Table<Self>> {
        &store.connections
    }
}

impl Stored for PacketRecord {
    fn table(store: &Store) -> &Mutex<Table<Self>> {
        &store.packets
    }
}
