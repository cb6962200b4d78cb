pub mod abstract_trait;
pub mod config;
pub mod cursor;
pub mod di;
pub mod domain;
pub mod metrics;
pub mod model;
pub mod repository;
pub mod service;
pub mod state;
