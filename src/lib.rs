//! fanscope — creator-profile statistics scraper and lookup API.
//!
//! Hosts two services under one process: a web API (search, profile lookup,
//! scrape requests, job status) and a scraper (job executor plus scheduled
//! staleness sweeps). Profile snapshots live in Postgres.

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod fans;
pub mod logging;
pub mod scraper;
pub mod services;
pub mod state;
pub mod utils;
pub mod web;
