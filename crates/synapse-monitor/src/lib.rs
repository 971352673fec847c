pub mod app;
pub mod config;
pub mod error;
pub mod pull;
pub mod push;
pub mod store;
pub mod theme;
pub mod ui;
pub mod view;
