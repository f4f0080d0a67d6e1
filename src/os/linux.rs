use std::collections::HashMap;
use std::net::SocketAddr;
use libc::pid_t;
use log::trace;
use procfs::{ProcError, ProcResult};
use procfs::net::{self, TcpState};
use procfs::process::{all_processes, FDTarget};
use crate::error::Result;
use crate::store::Status;
use super::{Counters, Socket};

pub fn counters() -> Result<HashMap<String, Counters>> {
    Ok(net::dev_status()?.into_iter().map(|(name, dev)| {
        (name, Counters {
            sent: dev.sent_bytes,
            recv: dev.recv_bytes,
        })
    }).collect())
}

pub fn connections() -> Result<Vec<Socket>> {
    let owners = owners()?;
    let owner  = |inode: u64| owners.get(&inode).copied();

    let mut socks = Vec::new();

    for e in net::tcp()?.into_iter().chain(optional(net::tcp6())?) {
        socks.push(socket(e.local_address, e.remote_address, owner(e.inode), status(&e.state)));
    }

    for e in net::udp()?.into_iter().chain(optional(net::udp6())?) {
        socks.push(socket(e.local_address, e.remote_address, owner(e.inode), Status::None));
    }

    trace!("enumerated {} sockets, {} owned inodes", socks.len(), owners.len());

    Ok(socks)
}

// socket inode -> pid, skipping processes whose fds we cannot read
fn owners() -> Result<HashMap<u64, pid_t>> {
    let mut map = HashMap::new();

    for proc in all_processes()?.flatten() {
        let fds = match proc.fd() {
            Ok(fds) => fds,
            Err(_)  => continue,
        };

        for fd in fds.flatten() {
            if let FDTarget::Socket(inode) = fd.target {
                map.insert(inode, proc.pid());
            }
        }
    }

    Ok(map)
}

fn socket(local: SocketAddr, remote: SocketAddr, pid: Option<pid_t>, status: Status) -> Socket {
    let remote = match remote.port() == 0 && remote.ip().is_unspecified() {
        true  => None,
        false => Some(remote),
    };

    Socket { local, remote, pid, status }
}

#[allow(unreachable_patterns)]
fn status(state: &TcpState) -> Status {
    match state {
        TcpState::Established => Status::Established,
        TcpState::SynSent     => Status::SynSent,
        TcpState::SynRecv     => Status::SynRecv,
        TcpState::FinWait1    => Status::FinWait1,
        TcpState::FinWait2    => Status::FinWait2,
        TcpState::TimeWait    => Status::TimeWait,
        TcpState::Close       => Status::Close,
        TcpState::CloseWait   => Status::CloseWait,
        TcpState::LastAck     => Status::LastAck,
        TcpState::Listen      => Status::Listen,
        TcpState::Closing     => Status::Closing,
        _                     => Status::None,
    }
}

fn optional<T>(r: ProcResult<Vec<T>>) -> ProcResult<Vec<T>> {
    match r {
        Err(ProcError::NotFound(_)) => Ok(Vec::new()),
        other                       => other,
    }
}
