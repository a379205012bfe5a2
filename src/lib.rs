// Public module exports for the tablepull binary
pub mod analysis;
pub mod blob;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod render;
pub mod table;
