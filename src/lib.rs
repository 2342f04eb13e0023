pub mod app;
pub mod discover;
pub mod limiter;
pub mod models;
pub mod query;
pub mod search;
pub mod tmdb;
