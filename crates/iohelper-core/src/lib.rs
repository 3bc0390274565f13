pub mod config;
pub mod listing;
pub mod walkthrough;
pub mod workspace;
