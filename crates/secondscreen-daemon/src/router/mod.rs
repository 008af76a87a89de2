//! Routing of opaque payloads to hosted content.

mod data;

pub use data::DataRouter;
