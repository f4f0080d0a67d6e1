use std::convert::TryFrom;
use std::time::Duration;
use log::{debug, warn};
use pcap::{Active, Capture};
use regex::Regex;
use crate::error::{Error, Result};

const DLT_EN10MB: i32 = 1;

#[derive(Debug)]
pub struct Config {
    pub capture:     Regex,
    pub exclude:     Regex,
    pub interval:    Duration,
    pub buffer_size: i32,
    pub snaplen:     i32,
    pub promisc:     bool,
    pub persist:     bool,
}

impl Config {
    /// Whether a link passes the capture and exclude patterns.
    pub fn accepts(&self, link: &str) -> bool {
        self.capture.is_match(link) && !self.exclude.is_match(link)
    }

    /// Open `link` with Ethernet framing and a read timeout of one interval,
    /// or None when the link offers no Ethernet framing.
    pub fn open(&self, link: &str) -> Result<Option<Capture<Active>>> {
        let timeout = i32::try_from(self.interval.as_millis()).map_err(|_| {
            Error::Capture(format!("read timeout {:?} out of range", self.interval))
        })?;

        let mut cap = Capture::from_device(link)?
            .promisc(self.promisc)
            .snaplen(self.snaplen)
            .buffer_size(self.buffer_size)
            .timeout(timeout)
            .open()?;

        let ethernet = cap.list_datalinks()?.into_iter().find(|dl| dl.0 == DLT_EN10MB);

        match ethernet {
            Some(dl) => {
                cap.set_datalink(dl)?;
                debug!("{} opened, snaplen {}", link, self.snaplen);
                Ok(Some(cap))
            },
            None => {
                warn!("{} has no ethernet framing", link);
                Ok(None)
            },
        }
    }
}
