//! Request extractors.

pub mod client_ip;
pub mod json_body;
