pub mod config;
pub mod defaults;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod reaper;
pub mod snapshot;
pub mod snapshotter;
