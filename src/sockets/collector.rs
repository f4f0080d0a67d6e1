use std::sync::Arc;
use std::time::{Duration, Instant};
use log::{debug, warn};
use tokio::task::spawn_blocking;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::os::Socket;
use crate::shutdown::Shutdown;
use crate::store::{ConnectionSample, Store};
use super::Correlation;

pub struct Collector {
    table:    Arc<Correlation>,
    interval: Duration,
    ttl:      Duration,
    clock:    Clock,
}

impl Collector {
    pub fn new(table: Arc<Correlation>, interval: Duration, ttl: Duration) -> Self {
        Self {
            table:    table,
            interval: interval,
            ttl:      ttl,
            clock:    Clock::new(),
        }
    }

    pub async fn exec<F>(mut self, read: F, store: Arc<Store>, shutdown: Shutdown)
    where
        F: Fn() -> Result<Vec<Socket>> + Send + Sync + 'static,
    {
        let read = Arc::new(read);

        while !shutdown.is_set() {
            let scan = read.clone();
            match spawn_blocking(move || scan()).await {
                Ok(Ok(socks)) => {
                    let n = self.cycle(socks, &store, Instant::now()).len();
                    debug!("recorded {} connections", n);
                },
                Ok(Err(e)) => warn!("connection sampling skipped: {}", e),
                Err(e)     => warn!("connection sampling failed: {}", e),
            }

            if !shutdown.sleep(self.interval).await {
                break;
            }
        }

        debug!("connection collector finished");
    }

    /// Record one enumeration of the connection table and republish the
    /// correlation table from it.
    pub fn cycle(&mut self, socks: Vec<Socket>, store: &Store, now: Instant) -> Vec<ConnectionSample> {
        let ts = self.clock.now();

        let samples = socks.into_iter().filter_map(|sock| {
            Some(ConnectionSample {
                local_address:  sock.local,
                remote_address: sock.remote?,
                owning_pid:     sock.pid?,
                status:         sock.status,
                captured_at:    ts,
            })
        }).collect::<Vec<_>>();

        let pairs = samples.iter().map(|s| {
            (s.local_address.port(), s.remote_address.port(), s.owning_pid)
        });
        self.table.publish(pairs, now, self.ttl);

        match store.append(samples.clone()) {
            Ok(())                   => (),
            Err(Error::Duplicate(n)) => debug!("{} connections already recorded", n),
            Err(e)                   => warn!("connection samples dropped: {}", e),
        }

        samples
    }
}
