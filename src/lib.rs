pub mod api;
pub mod app;
pub mod config;
pub mod models;
pub mod redirect;
pub mod registry;
pub mod shortcode;
pub mod storage;
pub mod telemetry;
