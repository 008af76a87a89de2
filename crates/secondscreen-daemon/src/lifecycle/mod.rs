//! Host attach/detach.

mod gateway;

pub use gateway::LifecycleGateway;
