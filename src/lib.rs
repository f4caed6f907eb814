pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod reconcile;
pub mod storage;
pub mod tui;
