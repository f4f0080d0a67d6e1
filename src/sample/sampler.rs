use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use log::{debug, trace, warn};
use crate::clock::{Clock, Timestamp};
use crate::error::Result;
use crate::os::Counters;
use crate::shutdown::Shutdown;
use crate::store::{Anomaly, InterfaceSample, Store};

/// Name of the host-wide sample emitted after the per-interface ones.
pub const TOTAL: &str = "total";

pub struct Sampler {
    prev:     HashMap<String, Counters>,
    last:     Option<Instant>,
    interval: Duration,
    clock:    Clock,
}

impl Sampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            prev:     HashMap::new(),
            last:     None,
            interval: interval,
            clock:    Clock::new(),
        }
    }

    pub async fn exec<F>(mut self, mut read: F, store: Arc<Store>, shutdown: Shutdown)
    where
        F: FnMut() -> Result<HashMap<String, Counters>>,
    {
        match read() {
            Ok(counters) => self.baseline(counters, Instant::now()),
            Err(e)       => warn!("interface baseline failed: {}", e),
        }

        while shutdown.sleep(self.interval).await {
            let counters = match read() {
                Ok(counters) => counters,
                Err(e)       => {
                    warn!("interface sampling skipped: {}", e);
                    continue;
                }
            };

            let ts      = self.clock.now();
            let samples = self.update(counters, Instant::now(), ts);

            debug!("sampled {} interfaces", samples.len());

            if let Err(e) = store.append(samples) {
                warn!("interface samples dropped: {}", e);
            }
        }

        debug!("interface sampler finished");
    }

    pub fn baseline(&mut self, counters: HashMap<String, Counters>, now: Instant) {
        self.prev = counters;
        self.last = Some(now);
    }

    /// Derive one sample per interface plus the host total, and replace the
    /// previous counters.
    pub fn update(&mut self, cur: HashMap<String, Counters>, now: Instant, ts: Timestamp) -> Vec<InterfaceSample> {
        let elapsed = self.last.map(|last| now.saturating_duration_since(last));
        let secs    = elapsed.map(|d| d.as_secs_f64()).filter(|&s| s > 0.0);
        let missed  = elapsed.map(|d| d >= self.interval * 2).unwrap_or(false);

        let mut samples = cur.iter().map(|(name, c)| {
            let prev = self.prev.get(name);

            let (upload,   sent_reset) = speed(prev.map(|p| p.sent), c.sent, secs);
            let (download, recv_reset) = speed(prev.map(|p| p.recv), c.recv, secs);

            let anomaly = match (sent_reset || recv_reset, missed && prev.is_some()) {
                (true, _)     => Some(Anomaly::Reset),
                (false, true) => Some(Anomaly::Gap),
                _             => None,
            };

            if let Some(anomaly) = anomaly {
                trace!("interface {} sample flagged {:?}", name, anomaly);
            }

            InterfaceSample {
                interface_name:        name.clone(),
                bytes_sent_cumulative: c.sent,
                bytes_recv_cumulative: c.recv,
                upload_speed:          upload,
                download_speed:        download,
                captured_at:           ts,
                anomaly:               anomaly,
            }
        }).collect::<Vec<_>>();

        samples.sort_by(|a, b| a.interface_name.cmp(&b.interface_name));

        if !samples.is_empty() {
            let total = aggregate(&samples, ts);
            samples.push(total);
        }

        self.prev = cur;
        self.last = Some(now);

        samples
    }
}

// bytes/second, or None with reset=true when the counter went backwards
fn speed(prev: Option<u64>, cur: u64, secs: Option<f64>) -> (Option<f64>, bool) {
    match (prev, secs) {
        (Some(prev), _) if cur < prev => (None, true),
        (Some(prev), Some(secs))      => (Some((cur - prev) as f64 / secs), false),
        _                             => (None, false),
    }
}

// Host throughput summed over the interfaces, so a link coming or going never
// shows up as a spike. Speeds are None only when no interface has one.
fn aggregate(samples: &[InterfaceSample], ts: Timestamp) -> InterfaceSample {
    let sent = samples.iter().map(|s| s.bytes_sent_cumulative);
    let recv = samples.iter().map(|s| s.bytes_recv_cumulative);

    InterfaceSample {
        interface_name:        TOTAL.to_owned(),
        bytes_sent_cumulative: sent.fold(0, u64::saturating_add),
        bytes_recv_cumulative: recv.fold(0, u64::saturating_add),
        upload_speed:          sum(samples.iter().filter_map(|s| s.upload_speed)),
        download_speed:        sum(samples.iter().filter_map(|s| s.download_speed)),
        captured_at:           ts,
        anomaly:               samples.iter().find_map(|s| s.anomaly),
    }
}

fn sum(speeds: impl Iterator<Item = f64>) -> Option<f64> {
    speeds.fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}
