pub mod app;
pub mod cli;
pub mod commands;
pub mod configuration;
pub mod context;
pub mod error;
pub mod repository;
pub mod tracing;
pub mod xml;
