#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod config;
pub mod data;
pub mod frequency;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod sentiment;
pub mod timeline;
pub mod tokenize;
pub mod video_id;
pub mod youtube;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
