pub mod agent;
pub mod args;
pub mod capture;
pub mod clock;
pub mod error;
pub mod link;
pub mod os;
pub mod packet;
pub mod query;
pub mod sample;
pub mod shutdown;
pub mod sockets;
pub mod store;
