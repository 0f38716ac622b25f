//! Model registry used to resolve mapping paths

pub mod models;
mod registry;

pub use models::{FieldDescriptor, FieldKind, ModelDescriptor, ScalarKind};
pub use registry::{Schema, SchemaError, SchemaRegistry};
