pub mod config;
pub mod logging;

pub mod checksum;
pub mod compare;
pub mod error;
pub mod http;
pub mod location;
pub mod manifest;
pub mod match_api;
pub mod report;
pub mod store;
pub mod sweep;
pub mod validators;
