// Library for tests to access modules

pub mod config;
pub mod docker_repo;
pub mod models;
pub mod poller;
pub mod routes;
pub mod scanner;
pub mod sizing;
pub mod store;
pub mod sysinfo_repo;
pub mod version;
