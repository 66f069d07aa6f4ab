pub mod archive;
pub mod client;
pub mod config;
pub mod deadline;
pub mod download;
pub mod error;
pub mod fs_util;
pub mod loader;
pub mod metrics;
pub mod names;
pub mod output;
pub mod query;
pub mod record;
pub mod revision;
pub mod schema;
pub mod store;
pub mod sync;
