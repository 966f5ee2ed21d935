pub mod api;
pub mod config;
pub mod dispatch;
pub mod metrics;
pub mod rate_limit;
pub mod snapshot;
pub mod support;
