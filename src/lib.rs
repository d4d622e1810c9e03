pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod logger;
pub mod prompt;
pub mod report;
pub mod schedule;
pub mod sheets;
pub mod source;
pub mod tracker;
pub mod youtube;
