#![warn(clippy::all, rust_2018_idioms)]

pub mod api;
mod app;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod filter;
pub mod grid;
pub mod model;
pub mod pages;
pub mod polling;
pub mod routes;
pub mod upload;
pub mod versions;
pub use app::App;
