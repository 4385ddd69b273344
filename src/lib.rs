/*
 * arbview - Arbitrage Deal Dashboard
 * Core library exports and module declarations
 */

pub mod api;
pub mod client;
pub mod config;
pub mod events;
pub mod models;
pub mod pipeline;
pub mod service;
pub mod settings;
pub mod utils;

pub use config::Config;
pub use models::*;
pub use service::DashboardService;
