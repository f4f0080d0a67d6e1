use std::collections::{HashMap, HashSet};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use anyhow::Result;
use crossbeam_channel::{Sender, Receiver, RecvTimeoutError, unbounded};
use log::{debug, warn};
use pcap::Device;
use pnet::datalink;
use pnet::util::MacAddr;
use crate::shutdown::Shutdown;
use super::Event;

pub struct Links {
    rx: Receiver<Event>,
}

impl Links {
    pub fn new(rx: Receiver<Event>) -> Self {
        Self { rx }
    }

    pub fn watch(every: Duration, shutdown: Shutdown) -> Result<(Self, JoinHandle<()>)> {
        let (tx, rx) = unbounded();
        let handle = thread::Builder::new().name("links".to_owned()).spawn(move || {
            monitor(tx, every, shutdown);
            debug!("link monitor finished");
        })?;
        Ok((Self::new(rx), handle))
    }

    pub fn recv(&self, timeout: Duration) -> Result<Event, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

fn monitor(tx: Sender<Event>, every: Duration, shutdown: Shutdown) {
    let mut links = HashSet::new();

    loop {
        match scan() {
            Ok(curr) => if !forward(&tx, changes(&mut links, &curr)) {
                debug!("link events no longer consumed");
                return;
            },
            Err(e) => warn!("link scan failed: {}", e),
        }

        if !shutdown.park(every) {
            return;
        }
    }
}

// false once the receiving side has gone away
fn forward(tx: &Sender<Event>, events: Vec<Event>) -> bool {
    events.into_iter().all(|event| tx.send(event).is_ok())
}

// capturable devices with the hardware address pnet reports for them
fn scan() -> Result<HashMap<String, Option<MacAddr>>> {
    let macs = datalink::interfaces().into_iter().map(|link| {
        (link.name, link.mac)
    }).collect::<HashMap<_, _>>();

    Ok(Device::list()?.into_iter().map(|d| {
        let mac = macs.get(&d.name).and_then(Option::clone);
        (d.name, mac)
    }).collect())
}

/// Diff the current device set against the known one, updating it.
pub(crate) fn changes(links: &mut HashSet<String>, curr: &HashMap<String, Option<MacAddr>>) -> Vec<Event> {
    let mut events = Vec::new();

    let mut added = curr.keys().filter(|link| !links.contains(*link)).cloned().collect::<Vec<_>>();
    added.sort();

    for link in added {
        events.push(Event::Add(link.clone(), curr[&link]));
        links.insert(link);
    }

    let mut gone = links.iter().filter(|link| !curr.contains_key(*link)).cloned().collect::<Vec<_>>();
    gone.sort();

    for link in gone {
        links.remove(&link);
        events.push(Event::Delete(link));
    }

    events
}

#[cfg(test)]
mod test {
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;
    use crossbeam_channel::unbounded;
    use pnet::util::MacAddr;
    use super::{changes, forward, Event, Links};

    #[test]
    fn link_changes_are_diffed() {
        let mac   = MacAddr::new(2, 0, 0, 0, 0, 1);
        let mut links = HashSet::new();

        let mut curr = HashMap::new();
        curr.insert("eth0".to_owned(), Some(mac));
        curr.insert("wg0".to_owned(),  None);

        assert_eq!(changes(&mut links, &curr), vec![
            Event::Add("eth0".to_owned(), Some(mac)),
            Event::Add("wg0".to_owned(),  None),
        ]);
        assert!(changes(&mut links, &curr).is_empty());

        curr.remove("wg0");
        assert_eq!(changes(&mut links, &curr), vec![Event::Delete("wg0".to_owned())]);
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn forwarding_stops_without_consumer() {
        let (tx, rx) = unbounded();
        let links    = Links::new(rx);

        assert!(forward(&tx, vec![Event::Delete("eth0".to_owned())]));
        assert_eq!(links.recv(Duration::from_millis(10)).ok(), Some(Event::Delete("eth0".to_owned())));

        drop(links);
        assert!(!forward(&tx, vec![Event::Add("eth1".to_owned(), None)]));
        assert!(forward(&tx, Vec::new()));
    }
}
