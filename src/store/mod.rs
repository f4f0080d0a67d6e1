use std::time::Duration;
use serde::{Serialize, Deserialize};

#[derive(Clone, Debug)]
pub struct Config {
    pub retention: Retention,
    pub capacity:  usize,
    pub limit:     usize,
}

#[derive(Clone, Debug)]
pub struct Retention {
    pub interfaces:  Duration,
    pub connections: Duration,
    pub packets:     Duration,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data:  Vec<T>,
    pub total: usize,
    pub count: usize,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: usize) -> Self {
        let count = data.len();
        Self { data, total, count }
    }
}

pub use filter::{Filter, Projection};
pub use record::{Anomaly, Collection, Document, Status};
pub use record::{ConnectionSample, InterfaceSample, PacketRecord};
pub use store::{Store, Stored};
pub use table::Table;

mod filter;
mod record;
mod store;
mod table;
