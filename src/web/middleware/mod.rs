//! Middleware for the file storage API.

pub mod cors;

pub use cors::create_cors_layer;
