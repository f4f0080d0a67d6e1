use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use anyhow::Result;
use futures::future::join_all;
use libc::pid_t;
use log::{debug, error, info, warn};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::task;
use crate::capture::{self, Meter, Sources, Traffic, Usage};
use crate::link::Links;
use crate::os;
use crate::query::{self, Api};
use crate::sample::Sampler;
use crate::shutdown::Shutdown;
use crate::sockets::{Collector, Correlation};
use crate::store::{self, Store};

#[derive(Debug)]
pub struct Config {
    pub interval: Duration,
    pub ttl:      Duration,
    pub listen:   Option<SocketAddr>,
    pub store:    store::Config,
    pub capture:  capture::Config,
}

/// Running collectors: async sampling loops on a private runtime plus the
/// blocking link monitor and capture supervisor threads.
pub struct Agent {
    runtime:  Runtime,
    store:    Arc<Store>,
    traffic:  Arc<Traffic>,
    table:    Arc<Correlation>,
    local:    Option<SocketAddr>,
    tasks:    Vec<task::JoinHandle<()>>,
    threads:  Vec<JoinHandle<()>>,
    shutdown: Shutdown,
}

impl Agent {
    pub fn start(cfg: Config) -> Result<Self> {
        let runtime  = Runtime::new()?;
        let shutdown = Shutdown::new();
        let store    = Arc::new(Store::new(&cfg.store));
        let traffic  = Arc::new(Traffic::new());
        let table    = Arc::new(Correlation::new());

        let mut tasks = Vec::new();

        let sampler = Sampler::new(cfg.interval);
        tasks.push(runtime.spawn(sampler.exec(os::counters, store.clone(), shutdown.clone())));

        let collector = Collector::new(table.clone(), cfg.interval, cfg.ttl);
        tasks.push(runtime.spawn(collector.exec(os::connections, store.clone(), shutdown.clone())));

        let meter = Meter::new(cfg.interval);
        tasks.push(runtime.spawn(meter.exec(traffic.clone(), shutdown.clone())));

        tasks.push(runtime.spawn(store.clone().reap(cfg.interval, shutdown.clone())));

        let local = match cfg.listen {
            Some(addr) => {
                let listener = runtime.block_on(TcpListener::bind(addr))?;
                let local    = listener.local_addr()?;
                let api      = Arc::new(Api::new(store.clone(), traffic.clone()));
                info!("query endpoint listening on {}", local);
                tasks.push(runtime.spawn(query::serve(listener, api, shutdown.clone())));
                Some(local)
            },
            None => None,
        };

        let (links, monitor) = Links::watch(cfg.interval, shutdown.clone())?;
        let sources = Sources::new(cfg.capture, traffic.clone(), table.clone(), store.clone(), shutdown.clone());

        let supervisor = thread::Builder::new().name("capture".to_owned()).spawn(move || {
            match sources.exec(links) {
                Ok(()) => debug!("capture supervisor finished"),
                Err(e) => error!("capture supervisor failed: {:?}", e),
            }
        })?;

        Ok(Self {
            runtime:  runtime,
            store:    store,
            traffic:  traffic,
            table:    table,
            local:    local,
            tasks:    tasks,
            threads:  vec![monitor, supervisor],
            shutdown: shutdown,
        })
    }

    pub fn api(&self) -> Api {
        Api::new(self.store.clone(), self.traffic.clone())
    }

    pub fn attribution(&self) -> HashMap<pid_t, Usage> {
        self.traffic.snapshot()
    }

    /// Address the query endpoint actually bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local
    }

    pub fn correlated(&self) -> usize {
        self.table.snapshot().len()
    }

    /// Signal every collector and wait for all of them to finish.
    pub fn stop(self) -> Result<()> {
        self.shutdown.signal();

        for result in self.runtime.block_on(join_all(self.tasks)) {
            if let Err(e) = result {
                warn!("collector task failed: {}", e);
            }
        }

        for thread in self.threads {
            if thread.join().is_err() {
                warn!("collector thread panicked");
            }
        }

        info!("collectors stopped");

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, Instant};
    use anyhow::Result;
    use regex::Regex;
    use tokio::runtime::Runtime;
    use crate::capture;
    use crate::query::{request, Request, Response};
    use crate::store;
    use super::{Agent, Config};

    fn config(interval: Duration) -> Result<Config> {
        let retention = Duration::from_secs(60);
        Ok(Config {
            interval: interval,
            ttl:      Duration::from_secs(60),
            listen:   Some("127.0.0.1:0".parse()?),
            store:    store::Config {
                retention: store::Retention {
                    interfaces:  retention,
                    connections: retention,
                    packets:     retention,
                },
                capacity: 10_000,
                limit:    100,
            },
            capture:  capture::Config {
                capture:     Regex::new("^$")?,
                exclude:     Regex::new("^(any|lo)$")?,
                interval:    interval,
                buffer_size: 1_000_000,
                snaplen:     128,
                promisc:     false,
                persist:     false,
            },
        })
    }

    #[test]
    fn agent_serves_and_stops() -> Result<()> {
        let interval = Duration::from_millis(200);
        let agent    = Agent::start(config(interval)?)?;
        let addr     = agent.local_addr().expect("endpoint");

        let rt  = Runtime::new()?;
        let res = rt.block_on(request(addr, Request::Attribution))?;
        assert_eq!(res, Response::Attribution(Vec::new()));
        assert!(agent.attribution().is_empty());
        assert!(agent.api().packets("")?.data.is_empty());

        let start = Instant::now();
        agent.stop()?;
        assert!(start.elapsed() < interval * 10);

        Ok(())
    }
}
