//! Member journeys: lists, details, milestones, templates and exports.

pub mod cache;
pub mod service;
pub mod types;

pub use service::JourneyService;
pub use types::*;
