mod bridge;
mod config;
mod helpers;
mod http_backend;
mod server;
