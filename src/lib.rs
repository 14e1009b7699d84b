pub mod api;
pub mod config;
pub mod domain;
pub mod download;
pub mod error;
pub mod mash;
pub mod matcher;
pub mod output;
pub mod store;
