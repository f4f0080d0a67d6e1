use std::fmt;
use crate::store::Collection;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    Sampling(String),
    CaptureUnavailable(String),
    Capture(String),
    Duplicate(usize),
    Full(Collection),
    InvalidFilter(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Sampling(err.to_string())
    }
}

impl From<pcap::Error> for Error {
    fn from(err: pcap::Error) -> Self {
        let msg = err.to_string();
        match denied(&msg) {
            true  => Error::CaptureUnavailable(msg),
            false => Error::Capture(msg),
        }
    }
}

#[cfg(target_os = "linux")]
impl From<procfs::ProcError> for Error {
    fn from(err: procfs::ProcError) -> Self {
        Error::Sampling(err.to_string())
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Error::Sampling(e)           => write!(f, "sampling failed: {}", e),
            Error::CaptureUnavailable(e) => write!(f, "capture unavailable: {}", e),
            Error::Capture(e)            => write!(f, "capture failed: {}", e),
            Error::Duplicate(n)          => write!(f, "{} duplicate records dropped", n),
            Error::Full(c)               => write!(f, "collection {} full", c),
            Error::InvalidFilter(e)      => write!(f, "invalid filter: {}", e),
        }
    }
}

fn denied(msg: &str) -> bool {
    let msg = msg.to_ascii_lowercase();
    msg.contains("permission") || msg.contains("not permitted")
}

#[cfg(test)]
mod test {
    use super::Error;

    #[test]
    fn pcap_permission_is_unavailable() {
        let err = pcap::Error::PcapError("eth0: You don't have permission to capture on that device".into());
        assert!(matches!(Error::from(err), Error::CaptureUnavailable(_)));

        let err = pcap::Error::PcapError("socket: Operation not permitted".into());
        assert!(matches!(Error::from(err), Error::CaptureUnavailable(_)));

        let err = pcap::Error::PcapError("eth9: No such device exists".into());
        assert!(matches!(Error::from(err), Error::Capture(_)));
    }
}
