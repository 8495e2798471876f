pub mod candidates;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod model;
pub mod optimizer;
pub mod ordered;
pub mod output;
pub mod progress;
pub mod server;
pub mod strategy;
