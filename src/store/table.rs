use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use log::trace;
use serde_json::Value;
use crate::clock::Timestamp;
use crate::error::{Error, Result};
use super::{Document, Filter};

pub struct Table<T: Document> {
    rows:      VecDeque<Row<T>>,
    keys:      HashSet<T::Key>,
    retention: Duration,
    capacity:  usize,
}

struct Row<T> {
    doc:     Arc<T>,
    expires: Instant,
}

impl<T: Document> Table<T> {
    pub fn new(retention: Duration, capacity: usize) -> Self {
        Self {
            rows:      VecDeque::new(),
            keys:      HashSet::new(),
            retention: retention,
            capacity:  capacity,
        }
    }

    pub fn insert(&mut self, docs: Vec<T>, now: Instant) -> Result<()> {
        self.expire(now);

        let mut dups = 0;

        for doc in docs {
            if self.rows.len() >= self.capacity {
                return Err(Error::Full(T::COLLECTION));
            }

            if let Some(key) = doc.key() {
                if !self.keys.insert(key) {
                    dups += 1;
                    continue;
                }
            }

            self.rows.push_back(Row {
                doc:     Arc::new(doc),
                expires: now + self.retention,
            });
        }

        match dups {
            0 => Ok(()),
            n => Err(Error::Duplicate(n)),
        }
    }

    pub fn expire(&mut self, now: Instant) -> usize {
        let mut count = 0;

        while let Some(row) = self.rows.front() {
            if row.expires > now {
                break;
            }

            if let Some(row) = self.rows.pop_front() {
                if let Some(key) = row.doc.key() {
                    self.keys.remove(&key);
                }
                count += 1;
            }
        }

        if count > 0 {
            trace!("expired {} {} records", count, T::COLLECTION);
        }

        count
    }

    pub fn live(&self, now: Instant) -> impl Iterator<Item = &Arc<T>> {
        self.rows.iter().filter(move |r| r.expires > now).map(|r| &r.doc)
    }

    /// Shared handles to every live row, in insertion order.
    pub fn snapshot(&self, now: Instant) -> Vec<Arc<T>> {
        self.live(now).cloned().collect()
    }
}

/// The `limit` newest rows matching `filter`, newest first, each with its
/// JSON rendering. Rows that cannot displace a kept one are not rendered.
pub fn newest<T: Document>(rows: &[Arc<T>], filter: &Filter, limit: usize) -> Vec<(Arc<T>, Value)> {
    let mut heap = BinaryHeap::with_capacity(limit + 1);

    for (seq, doc) in rows.iter().enumerate() {
        let key = (doc.captured_at(), seq);

        if heap.len() >= limit {
            match heap.peek() {
                Some(Reverse(min)) if key > Hit::key(min) => (),
                _                                        => continue,
            }
        }

        let value = match serde_json::to_value(&**doc) {
            Ok(value) => value,
            Err(_)    => continue,
        };

        if !filter.matches(&value) {
            continue;
        }

        heap.push(Reverse(Hit { at: key.0, seq, doc: doc.clone(), value }));

        if heap.len() > limit {
            heap.pop();
        }
    }

    heap.into_sorted_vec().into_iter().map(|Reverse(hit)| (hit.doc, hit.value)).collect()
}

struct Hit<T> {
    at:    Timestamp,
    seq:   usize,
    doc:   Arc<T>,
    value: Value,
}

impl<T> Hit<T> {
    fn key(&self) -> (Timestamp, usize) {
        (self.at, self.seq)
    }
}

impl<T> PartialEq for Hit<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<T> Eq for Hit<T> {}

impl<T> PartialOrd for Hit<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Hit<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}
