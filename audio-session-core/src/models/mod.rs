pub mod audio_models;
pub mod config;
pub mod error;
pub mod route;
pub mod state;
