pub mod config;
pub mod controller;
pub mod hardware;
pub mod mqtt;
