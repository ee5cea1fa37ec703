//! HTTP clients backing the ports in production.

pub mod rest;

pub use rest::RestEngineClient;
