pub mod config;
pub mod error;
pub mod inference;
pub mod preprocess;
pub mod routes;
