//! Backend REST API plumbing.
//! Provides the request executor and the types shared by every facade.

pub mod executor;
pub mod params;
pub mod request;
pub mod retry;
pub mod types;

pub use executor::RequestExecutor;
pub use params::QueryParams;
pub use request::{Attachment, MultipartBody, RequestBody, RequestDescriptor};
pub use retry::{RetryPolicy, RetryState};
pub use types::{Blob, BulkResult, ExportFormat, Page, SortOrder};
