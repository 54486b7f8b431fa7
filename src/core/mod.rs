//! Bus runtime: [`EventBus`], its registries, the worker pool and
//! configuration.

mod bus;
mod config;
mod pool;
mod registry;

pub use bus::EventBus;
pub use config::BusConfig;
pub use pool::WorkerPool;
