pub mod browser_resolver;
pub mod config;
