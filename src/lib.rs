pub mod app;
pub mod cgroup;
pub mod controller;
pub mod core;
pub mod queue;
pub mod repository;
pub mod server;
