use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use anyhow::Result;
use crossbeam_channel::RecvTimeoutError;
use log::{debug, info, warn};
use parking_lot::Mutex;
use crate::clock::Clock;
use crate::error::Error;
use crate::link::{Event, Links, MacAddr};
use crate::shutdown::Shutdown;
use crate::sockets::{Correlation, View};
use crate::store::Store;
use super::{decode, Config, Traffic};
use super::queue::Queue;
use pcap::Error::*;

/// Supervises one capture thread per accepted link.
pub struct Sources {
    cfg:      Arc<Config>,
    traffic:  Arc<Traffic>,
    table:    Arc<Correlation>,
    store:    Arc<Store>,
    map:      Arc<Mutex<HashMap<String, Source>>>,
    threads:  Vec<JoinHandle<()>>,
    denied:   Arc<AtomicBool>,
    shutdown: Shutdown,
}

#[derive(Debug)]
pub struct Source {
    stop: Arc<AtomicBool>,
}

impl Sources {
    pub fn new(cfg: Config, traffic: Arc<Traffic>, table: Arc<Correlation>, store: Arc<Store>, shutdown: Shutdown) -> Self {
        Self {
            cfg:      Arc::new(cfg),
            traffic:  traffic,
            table:    table,
            store:    store,
            map:      Arc::new(Mutex::new(HashMap::new())),
            threads:  Vec::new(),
            denied:   Arc::new(AtomicBool::new(false)),
            shutdown: shutdown,
        }
    }

    /// Follow link events until shutdown, or until capture turns out to be
    /// unavailable, then wait for every capture thread to exit.
    pub fn exec(mut self, links: Links) -> Result<()> {
        while !self.shutdown.is_set() && !self.denied.load(Ordering::Acquire) {
            match links.recv(self.cfg.interval) {
                Ok(Event::Add(link, mac))          => self.add(link, mac),
                Ok(Event::Delete(link))            => self.del(&link),
                Err(RecvTimeoutError::Timeout)      => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if self.denied.load(Ordering::Acquire) {
            warn!("packet capture unavailable, attribution disabled");
        }

        self.stop();

        Ok(())
    }

    pub fn add(&mut self, name: String, mac: Option<MacAddr>) {
        if let Some(mac) = mac {
            self.traffic.add_mac(mac);
        }

        if !self.check(&name) {
            return;
        }

        let store = match self.cfg.persist {
            true  => Some(self.store.clone()),
            false => None,
        };

        let mut task = Task {
            cfg:      self.cfg.clone(),
            traffic:  self.traffic.clone(),
            view:     self.table.view(),
            queue:    Queue::new(Arc::new(name.clone()), store, self.cfg.interval),
            clock:    Clock::new(),
            shutdown: self.shutdown.clone(),
        };

        let link = name.clone();
        if let Err(e) = self.spawn(name, move |stop| task.poll(&link, &stop)) {
            warn!("capture thread not started: {}", e);
        }
    }

    pub fn del(&mut self, link: &str) {
        if let Some(s) = self.map.lock().get(link) {
            info!("stopping {} capture", link);
            s.stop.store(true, Ordering::Release);
        }
    }

    /// Run `work` on a named thread registered under `name`; it is handed
    /// the stop flag that `del` and shutdown raise.
    pub(super) fn spawn<F>(&mut self, name: String, work: F) -> Result<()>
    where
        F: FnOnce(Arc<AtomicBool>) -> Result<(), Error> + Send + 'static,
    {
        let stop   = Arc::new(AtomicBool::new(false));
        let map    = self.map.clone();
        let denied = self.denied.clone();
        let key    = name.clone();

        self.map.lock().insert(key.clone(), Source { stop: stop.clone() });

        let thread = thread::Builder::new().name(format!("capture-{}", name)).spawn(move || {
            info!("starting {} capture", name);
            settle(&name, work(stop), &denied);
            map.lock().remove(&name);
        });

        match thread {
            Ok(thread) => {
                self.threads.retain(|t| !t.is_finished());
                self.threads.push(thread);
                Ok(())
            },
            Err(e) => {
                self.map.lock().remove(&key);
                Err(e.into())
            },
        }
    }

    fn stop(&mut self) {
        for source in self.map.lock().values() {
            source.stop.store(true, Ordering::Release);
        }

        for thread in self.threads.drain(..) {
            if thread.join().is_err() {
                warn!("capture thread panicked");
            }
        }
    }

    fn check(&self, link: &str) -> bool {
        if !self.cfg.accepts(link) {
            info!("link {} not captured", link);
            return false;
        }

        if self.map.lock().contains_key(link) {
            info!("link {} already active", link);
            return false;
        }

        true
    }
}

/// Record how a capture thread ended. Missing privileges disable capture
/// for every link.
pub(super) fn settle(link: &str, outcome: Result<(), Error>, denied: &AtomicBool) {
    match outcome {
        Ok(())                            => debug!("capture {} finished", link),
        Err(Error::CaptureUnavailable(e)) => {
            warn!("capture {} unavailable: {}", link, e);
            denied.store(true, Ordering::Release);
        },
        Err(e)                            => warn!("capture {} stopped: {}", link, e),
    }
}

struct Task {
    cfg:      Arc<Config>,
    traffic:  Arc<Traffic>,
    view:     View,
    queue:    Queue,
    clock:    Clock,
    shutdown: Shutdown,
}

impl Task {
    fn poll(&mut self, dev: &str, stop: &AtomicBool) -> Result<(), Error> {
        let mut cap = match self.cfg.open(dev)? {
            Some(cap) => cap,
            None      => return Ok(()),
        };

        while !stop.load(Ordering::Acquire) && !self.shutdown.is_set() {
            match cap.next() {
                Ok(packet)          => self.record(packet),
                Err(TimeoutExpired) => self.queue.export(self.clock.now()),
                Err(NoMorePackets)  => break,
                Err(e)              => {
                    self.queue.flush();
                    return Err(e.into());
                }
            }
        }

        self.queue.flush();

        Ok(())
    }

    fn record(&mut self, packet: pcap::Packet<'_>) {
        let mut frame = match decode::capture(packet) {
            Some(frame) => frame,
            None        => return,
        };

        frame.timestamp = self.clock.observe(frame.timestamp);

        self.view.refresh();
        let pid = self.traffic.attribute(&self.view, &frame);

        self.queue.record(&frame, pid);
        self.queue.export(frame.timestamp);
    }
}
