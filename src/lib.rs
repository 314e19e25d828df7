// Library for tests to access modules

pub mod analytics;
pub mod config;
pub mod error;
pub mod host;
pub mod maintenance;
pub mod models;
pub mod routes;
pub mod sampler;
pub mod seed;
pub mod store;
pub mod version;
