pub mod analysis;
pub mod config;
pub mod display;
pub mod fetch;
pub mod import;
pub mod service;
