pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod labels;
pub mod local_store;
pub mod locale;
pub mod models;
pub mod services;

#[cfg(test)]
mod test_support;
