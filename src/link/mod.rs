pub use pnet::util::MacAddr;

#[derive(Debug, Eq, PartialEq)]
pub enum Event {
    Add(String, Option<MacAddr>),
    Delete(String),
}

pub use monitor::Links;

mod monitor;
