//! Command-line surface.

pub mod app;
mod commands;
mod config;
mod context;
mod dispatch;
mod env;
pub mod output;
mod plan;
mod research;
pub mod runtime;
mod schema;

pub use app::run;
