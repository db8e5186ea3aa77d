#![forbid(unsafe_code)]

pub mod model;
pub mod sampler;
pub mod scoring;
pub mod stats;
pub mod time;
pub mod timer;

pub use time::Clock;
