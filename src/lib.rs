pub mod activity_log;
pub mod bot;
pub mod config;
pub mod geo;
pub mod handlers;
pub mod net;
pub mod server;
