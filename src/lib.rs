pub mod chart;
pub mod config;
pub mod export;
pub mod format;
pub mod grid;
pub mod model;
pub mod query;
pub mod service;
pub mod startup;
pub mod storage;
pub mod tasks;
pub mod toast;
pub mod ui;
pub mod upload;
