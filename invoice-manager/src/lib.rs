pub mod config;
pub mod currency;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod numbering;
pub mod render;
pub mod services;
pub mod startup;
pub mod totals;
