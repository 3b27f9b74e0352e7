//! Cassettes: recorded API traffic that can be replayed without a network.

pub mod format;
pub mod recorder;
pub mod replayer;
