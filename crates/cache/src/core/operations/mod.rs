//! Cache operations, implemented directly on [`BoundedCache`](super::BoundedCache)

mod get;
mod put;
mod remove;
mod stats;
