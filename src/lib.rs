pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod gcp;
pub mod media;
pub mod pipeline;
