//! Follow-up tasks: lists, details, comments, bulk completion and exports.

pub mod cache;
pub mod service;
pub mod types;

pub use service::TaskService;
pub use types::*;
