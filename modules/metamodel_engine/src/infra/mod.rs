//! Infrastructure layer - datasource connectivity, secrets and catalog storage

pub mod datasource;
pub mod memory;
pub mod secret;
pub mod storage;
