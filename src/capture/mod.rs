pub use config::Config;
pub use decode::{decode, Frame};
pub use meter::{Meter, Rate};
pub use queue::Queue;
pub use source::Sources;
pub use traffic::{Accumulator, Direction, Traffic, Usage};

mod config;
mod decode;
mod meter;
mod queue;
mod source;
mod traffic;
