//! Import CSV rows into structured records
//!
//! Each row is mapped onto a tree of pending records (the root model plus
//! related records reached through foreign keys and many-to-many fields),
//! which is then saved bottom-up against a [`store::Store`].

pub mod audit;
pub mod cli;
pub mod config;
pub mod import;
pub mod input;
pub mod schema;
pub mod store;
