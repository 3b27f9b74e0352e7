//! Port implementations.
//!
//! `live` talks to GitHub and the local disk, `recording` and `replaying`
//! capture and serve cassettes, and `memory` is an in-process Git Data API
//! used as a deterministic stand-in for GitHub.

pub mod live;
pub mod memory;
pub mod recording;
pub mod replaying;
