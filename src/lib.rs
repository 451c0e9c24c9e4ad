pub mod config;
pub mod embedding;
pub mod errors;
pub mod logging;
pub mod presign;
pub mod provider;
pub mod search;
pub mod server;
