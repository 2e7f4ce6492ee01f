// Public API - what other modules can use
pub use service::GameService;

pub mod models;
pub mod pairing;
pub mod repository;
pub mod service;
