// Command handlers module
pub mod completions;
pub mod config;
pub mod cookies;
pub mod get;
pub mod options;
pub mod preview;
