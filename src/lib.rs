pub mod api;
pub mod chart;
pub mod config;
pub mod db;
pub mod detector;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod seed;
pub mod state;
pub mod types;
pub mod view;

#[cfg(test)]
mod testutil;
