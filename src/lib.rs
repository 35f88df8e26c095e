pub mod bootstrap;
pub mod config;
pub mod delivery;
pub mod error;
pub mod settlement;
pub mod store;
