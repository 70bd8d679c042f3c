pub mod command;
pub mod config;
pub mod controller;
pub mod hardware;
pub mod runtime;
pub mod supervisor;
pub mod transport;
pub mod vehicle;
