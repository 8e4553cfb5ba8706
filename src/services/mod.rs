//! Process-level service hosting: the manager, signal handling, and the web
//! service wrapper.

pub mod manager;
pub mod signals;
pub mod web;

pub use manager::{Service, ServiceManager};
