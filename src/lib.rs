// src/lib.rs
//! Influra drafts LinkedIn posts from a profile, trend notes and optional images
//! with a generative model, keeps drafts in SQLite and publishes them to LinkedIn.

pub mod ai;
pub mod cli;
pub mod core;
pub mod export;
pub mod jobs;
pub mod linkedin;
pub mod logging;
pub mod state;
pub mod utils;
pub mod web;

pub use crate::core::{ConfigManager, DraftStore};
pub use web::{build_rocket, start_web_server, AppServices};
