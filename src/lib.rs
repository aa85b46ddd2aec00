pub mod assets;
pub mod config;
pub mod covers;
pub mod database;
pub mod errors;
pub mod feed;
pub mod models;
pub mod utils;
pub mod web;
