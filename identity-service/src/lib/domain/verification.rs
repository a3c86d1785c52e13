pub mod code;
pub mod models;
pub mod service;
