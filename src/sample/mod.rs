pub use sampler::{Sampler, TOTAL};

mod sampler;
