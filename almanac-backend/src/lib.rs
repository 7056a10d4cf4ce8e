//! Core library for the almanac backend: entry lifecycle, dual-store
//! persistence (index database + document files), and the reminder
//! scheduling engine. The interactive shell and scripting layers live
//! elsewhere and consume the manager API exposed here.

pub mod config;
pub mod db;
pub mod documents;
pub mod error;
pub mod managers;
pub mod models;
pub mod notify;
pub mod scheduler;
pub mod store;
