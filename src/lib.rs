pub mod analytics;
pub mod fetch;
pub mod forecast;
pub mod ingest;
pub mod output;
pub mod snapshot;
pub mod store;
pub mod synth;
