// Library for tests to access modules

pub mod backfill;
pub mod config;
pub mod metrics_store;
pub mod models;
pub mod retention;
pub mod rollup;
pub mod scheduler;
