//! API layer - in-process client over the domain services

pub mod native;
