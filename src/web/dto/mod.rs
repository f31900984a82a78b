//! Data Transfer Objects for the file storage API.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;
