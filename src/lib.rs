pub mod builder;
pub mod cli;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod naming;
pub mod platform;
pub mod preload;
pub mod resolve;
pub mod resource;
pub mod service;
pub mod spec;

pub use anyhow::Result;
