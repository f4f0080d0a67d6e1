pub use collector::Collector;
pub use table::{Correlation, Ports, Snapshot, View};

mod collector;
mod table;
