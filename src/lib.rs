pub mod api;
pub mod config;
pub mod domain;
pub mod loading;
pub mod metrics;
pub mod service;
pub mod store;

#[cfg(test)]
mod test_support;
