pub mod config;
pub mod feed;
pub mod feed_model;
pub mod http_cache;
pub mod http_client;
pub mod state;
pub mod view;
