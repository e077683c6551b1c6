pub mod analysis;
pub mod chunk;
pub mod config;
pub mod context;
pub mod engine;
pub mod events;
pub mod fetch_head;
pub mod http;
pub mod logging;
pub mod normalize;
pub mod proxy;
pub mod resolver;
pub mod server;
pub mod target;
pub mod url_model;
