pub mod app;
pub mod check;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod formatter;
pub mod output;
pub mod probe;
