//! Output surface enumeration.

mod catalog;

pub use catalog::DisplayCatalog;
