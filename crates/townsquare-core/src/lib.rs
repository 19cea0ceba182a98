//! # Townsquare Core Library
//!
//! Feeds calendar events of the ratingallocate activity into the townsquare
//! dashboard. The CLI is a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Provider**: one parameterized query per request, then per-viewer
//!   visibility filters and instance-name enrichment
//! - **Registry**: explicit table of event sources the dashboard merges
//! - **Storage**: SQLite access with versioned migrations and TOML configuration
//!
//! ## Key Components
//!
//! - [`EventProvider`]: Event source for one activity module
//! - [`ProviderRegistry`]: Registered sources and the merged feed
//! - [`ViewerContext`]: Availability and completion checks for one user
//! - [`Database`]: Store access
//! - [`Config`]: Feed configuration management

pub mod error;
pub mod events;
pub mod lang;
pub mod provider;
pub mod registry;
pub mod storage;
pub mod viewer;
pub mod window;

pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::{Event, EXPECT_COMPLETION_ON};
pub use provider::{AggregatorContext, EventProvider, EventSource};
pub use registry::ProviderRegistry;
pub use storage::{Config, Database, EventRow};
pub use viewer::{ViewerContext, ViewerFilter};
pub use window::QueryWindow;
