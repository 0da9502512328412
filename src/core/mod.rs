// src/core/mod.rs
//! Configuration and persistence shared by the web server and the CLI

pub mod config_manager;
pub mod database;

pub use config_manager::ConfigManager;
pub use database::DraftStore;
