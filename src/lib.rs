#![forbid(unsafe_code)]

pub mod app;
pub mod classify;
pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod locate;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod sitemap;
pub mod store;
pub mod summary;
