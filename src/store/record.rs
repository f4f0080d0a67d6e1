use std::fmt;
use std::hash::Hash;
use std::net::{IpAddr, SocketAddr};
use libc::pid_t;
use serde::{Serialize, Deserialize};
use crate::clock::Timestamp;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Interfaces,
    Connections,
    Packets,
}

/// A record type owned by exactly one store collection.
pub trait Document: Clone + Serialize + Send + 'static {
    type Key: Eq + Hash + Send;

    const COLLECTION: Collection;
    const FIELDS: &'static [&'static str];

    fn captured_at(&self) -> Timestamp;

    fn key(&self) -> Option<Self::Key> {
        None
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterfaceSample {
    pub interface_name:        String,
    pub bytes_sent_cumulative: u64,
    pub bytes_recv_cumulative: u64,
    pub upload_speed:          Option<f64>,
    pub download_speed:        Option<f64>,
    pub captured_at:           Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly:               Option<Anomaly>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anomaly {
    Reset,
    Gap,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSample {
    pub local_address:  SocketAddr,
    pub remote_address: SocketAddr,
    pub owning_pid:     pid_t,
    pub status:         Status,
    pub captured_at:    Timestamp,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Established,
    SynSent,
    SynRecv,
    #[serde(rename = "FIN_WAIT1")]
    FinWait1,
    #[serde(rename = "FIN_WAIT2")]
    FinWait2,
    TimeWait,
    Close,
    CloseWait,
    LastAck,
    Listen,
    Closing,
    None,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PacketRecord {
    pub interface_name:      String,
    pub source_address:      IpAddr,
    pub destination_address: IpAddr,
    pub length:              usize,
    pub captured_at:         Timestamp,
    pub owning_pid:          Option<pid_t>,
}

impl Document for InterfaceSample {
    type Key = ();

    const COLLECTION: Collection = Collection::Interfaces;
    const FIELDS: &'static [&'static str] = &[
        "interface_name",
        "bytes_sent_cumulative",
        "bytes_recv_cumulative",
        "upload_speed",
        "download_speed",
        "captured_at",
        "anomaly",
    ];

    fn captured_at(&self) -> Timestamp {
        self.captured_at
    }
}

impl Document for ConnectionSample {
    type Key = (SocketAddr, SocketAddr, pid_t, Timestamp);

    const COLLECTION: Collection = Collection::Connections;
    const FIELDS: &'static [&'static str] = &[
        "local_address",
        "remote_address",
        "owning_pid",
        "status",
        "captured_at",
    ];

    fn captured_at(&self) -> Timestamp {
        self.captured_at
    }

    fn key(&self) -> Option<Self::Key> {
        Some((self.local_address, self.remote_address, self.owning_pid, self.captured_at))
    }
}

impl Document for PacketRecord {
    type Key = ();

    const COLLECTION: Collection = Collection::Packets;
    const FIELDS: &'static [&'static str] = &[
        "interface_name",
        "source_address",
        "destination_address",
        "length",
        "captured_at",
        "owning_pid",
    ];

    fn captured_at(&self) -> Timestamp {
        self.captured_at
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Collection::Interfaces  => "interfaces",
            Collection::Connections => "connections",
            Collection::Packets     => "packets",
        })
    }
}
