pub mod config;
pub mod dialog;
