use std::sync::Arc;
use libc::pid_t;
use serde::{Serialize, Deserialize};
use serde_json::Value;
use crate::capture::Traffic;
use crate::error::Result;
use crate::store::{ConnectionSample, InterfaceSample, PacketRecord};
use crate::store::{Filter, Page, Projection, Store, Stored};

pub use server::{request, serve};

mod server;

#[cfg(test)]
mod test;

/// Read operations a REST layer exposes over the collected telemetry.
pub struct Api {
    store:   Arc<Store>,
    traffic: Arc<Traffic>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Request {
    Interfaces(Select),
    Connections(Select),
    Packets(Select),
    Attribution,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Select {
    #[serde(default)]
    pub filter: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub limit:  Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Page(Page<Value>),
    Attribution(Vec<Attributed>),
    Error { error: String },
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attributed {
    pub owning_pid:     pid_t,
    pub upload_bytes:   u64,
    pub download_bytes: u64,
    #[serde(default)]
    pub upload_speed:   Option<f64>,
    #[serde(default)]
    pub download_speed: Option<f64>,
}

impl Api {
    pub fn new(store: Arc<Store>, traffic: Arc<Traffic>) -> Self {
        Self { store, traffic }
    }

    pub fn interfaces(&self, filter: &str) -> Result<Page<InterfaceSample>> {
        self.find(filter)
    }

    pub fn connections(&self, filter: &str) -> Result<Page<ConnectionSample>> {
        self.find(filter)
    }

    pub fn packets(&self, filter: &str) -> Result<Page<PacketRecord>> {
        self.find(filter)
    }

    /// Per-process byte totals, sorted by pid, with the rates of the last
    /// refresh interval once one has been measured.
    pub fn attribution(&self) -> Vec<Attributed> {
        let rates = self.traffic.rates();

        let mut list = self.traffic.snapshot().into_iter().map(|(pid, usage)| {
            let rate = rates.get(&pid);
            Attributed {
                owning_pid:     pid,
                upload_bytes:   usage.upload_bytes,
                download_bytes: usage.download_bytes,
                upload_speed:   rate.map(|r| r.upload_speed),
                download_speed: rate.map(|r| r.download_speed),
            }
        }).collect::<Vec<_>>();

        list.sort_by_key(|a| a.owning_pid);
        list
    }

    pub fn handle(&self, req: Request) -> Response {
        let page = match req {
            Request::Interfaces(sel)  => self.select::<InterfaceSample>(&sel),
            Request::Connections(sel) => self.select::<ConnectionSample>(&sel),
            Request::Packets(sel)     => self.select::<PacketRecord>(&sel),
            Request::Attribution      => return Response::Attribution(self.attribution()),
        };

        match page {
            Ok(page) => Response::Page(page),
            Err(e)   => Response::Error { error: e.to_string() },
        }
    }

    fn find<T: Stored>(&self, filter: &str) -> Result<Page<T>> {
        let filter = Filter::parse::<T>(filter)?;
        Ok(self.store.find(&filter, None))
    }

    fn select<T: Stored>(&self, sel: &Select) -> Result<Page<Value>> {
        let filter = Filter::parse::<T>(&sel.filter)?;
        let fields = Projection::parse::<T, _>(&sel.fields)?;
        Ok(self.store.query::<T>(&filter, &fields, sel.limit))
    }
}
