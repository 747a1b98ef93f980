//! Port implementations.
//!
//! `live` talks to real services over HTTP; `memory` keeps everything in
//! process and logs every call, for tests and local experiments.

pub mod live;
pub mod memory;
