//! Storage layer - type catalog entities, migrations and repositories

pub mod entity;
pub mod mapper;
pub mod migrations;
pub mod repositories;

pub use repositories::{SeaOrmLinkInstanceRepository, SeaOrmTypeCatalog};
