pub mod api;
pub mod app;
pub mod endpoints;
pub mod pipeline;
pub mod server;
pub mod telemetry;
