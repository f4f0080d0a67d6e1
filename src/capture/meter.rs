use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use libc::pid_t;
use log::{debug, trace};
use serde::{Serialize, Deserialize};
use crate::shutdown::Shutdown;
use super::{Traffic, Usage};

/// Bytes/second of one process over the last refresh interval.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub upload_speed:   f64,
    pub download_speed: f64,
}

/// Turns the growing per-process totals into per-interval rates.
pub struct Meter {
    prev:     HashMap<pid_t, Usage>,
    last:     Option<Instant>,
    interval: Duration,
}

impl Meter {
    pub fn new(interval: Duration) -> Self {
        Self {
            prev:     HashMap::new(),
            last:     None,
            interval: interval,
        }
    }

    pub async fn exec(mut self, traffic: Arc<Traffic>, shutdown: Shutdown) {
        self.update(traffic.snapshot(), Instant::now());

        while shutdown.sleep(self.interval).await {
            let rates = self.update(traffic.snapshot(), Instant::now());
            trace!("metered {} processes", rates.len());
            traffic.publish(rates);
        }

        debug!("traffic meter finished");
    }

    /// Rates since the previous call; empty on the first one. A process
    /// first seen during the interval counts from zero.
    pub fn update(&mut self, cur: HashMap<pid_t, Usage>, now: Instant) -> HashMap<pid_t, Rate> {
        let elapsed = self.last.map(|last| now.saturating_duration_since(last));
        let secs    = elapsed.map(|d| d.as_secs_f64()).filter(|&s| s > 0.0);

        let rates = match secs {
            Some(secs) => cur.iter().map(|(&pid, usage)| {
                let prev = self.prev.get(&pid).copied().unwrap_or_default();
                (pid, Rate {
                    upload_speed:   delta(prev.upload_bytes,   usage.upload_bytes)   / secs,
                    download_speed: delta(prev.download_bytes, usage.download_bytes) / secs,
                })
            }).collect(),
            None => HashMap::new(),
        };

        self.prev = cur;
        self.last = Some(now);

        rates
    }
}

fn delta(prev: u64, cur: u64) -> f64 {
    cur.saturating_sub(prev) as f64
}
