//! Persistence layer: plain query functions over a shared `PgPool`.

pub mod kv;
pub mod models;
pub mod profiles;
pub mod scrape_jobs;
pub mod unsigned;
