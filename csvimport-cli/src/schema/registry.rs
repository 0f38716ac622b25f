//! Schema registry backed by a TOML model definition file
//!
//! Example definition:
//! ```toml
//! [models."shop.Item"]
//! fields = [
//!     { name = "name", kind = "text", unique = true },
//!     { name = "price", kind = "DecimalField" },
//!     { name = "category", kind = "foreign_key", related = "shop.Category", nullable = false },
//!     { name = "tags", kind = "many_to_many", related = "shop.Tag", through = "shop.ItemTag" },
//! ]
//! ```
//!
//! Kinds the importer has no dedicated cleaning for are folded into the
//! nearest one: boolean fields are kept as text, and datetime fields are
//! read as dates, with any time part after the date dropped.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::models::{FieldDescriptor, FieldKind, ModelDescriptor, ScalarKind};

/// Error looking up models or fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Model is not registered
    UnknownModel { model: String },
    /// Model has no field with this name
    NoSuchField { model: String, field: String },
    /// Field declares a kind we do not understand
    InvalidKind {
        model: String,
        field: String,
        kind: String,
    },
    /// Relational field without a `related` model
    MissingRelated { model: String, field: String },
    /// Join model endpoints could not be determined
    JoinEndpoint { through: String, message: String },
    /// Definition file could not be parsed
    Parse(String),
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::UnknownModel { model } => write!(f, "model '{}' is not registered", model),
            SchemaError::NoSuchField { model, field } => {
                write!(f, "no such field '{}' on {}", field, model)
            }
            SchemaError::InvalidKind { model, field, kind } => {
                write!(f, "field '{}.{}' has unknown kind '{}'", model, field, kind)
            }
            SchemaError::MissingRelated { model, field } => {
                write!(f, "relational field '{}.{}' is missing 'related'", model, field)
            }
            SchemaError::JoinEndpoint { through, message } => {
                write!(f, "join model '{}': {}", through, message)
            }
            SchemaError::Parse(msg) => write!(f, "invalid schema definition: {}", msg),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Read-only access to model definitions
pub trait SchemaRegistry {
    /// Look up a model by qualified name
    fn model(&self, name: &str) -> Option<&ModelDescriptor>;

    /// Look up a field on a model
    fn field(&self, model: &str, name: &str) -> Result<&FieldDescriptor, SchemaError> {
        let descriptor = self.model(model).ok_or_else(|| SchemaError::UnknownModel {
            model: model.to_string(),
        })?;
        descriptor.field(name).ok_or_else(|| SchemaError::NoSuchField {
            model: model.to_string(),
            field: name.to_string(),
        })
    }

    /// Resolve the (owner, related) foreign keys on a many-to-many join model
    ///
    /// Uses `through_fields` when declared, otherwise the first foreign key
    /// pointing at the owner and the first other foreign key pointing at the
    /// related model.
    fn join_endpoints(
        &self,
        owner_model: &str,
        field: &FieldDescriptor,
    ) -> Result<(&FieldDescriptor, &FieldDescriptor), SchemaError> {
        let FieldKind::ManyToMany {
            related,
            through: Some(through),
            through_fields,
        } = &field.kind
        else {
            return Err(SchemaError::JoinEndpoint {
                through: field.name.clone(),
                message: "field is not a many-to-many relation with a join model".into(),
            });
        };

        if let Some((owner_field, related_field)) = through_fields {
            return Ok((self.field(through, owner_field)?, self.field(through, related_field)?));
        }

        let join = self.model(through).ok_or_else(|| SchemaError::UnknownModel {
            model: through.clone(),
        })?;

        let owner_fk = join
            .fields
            .iter()
            .find(|f| f.points_at(owner_model))
            .ok_or_else(|| SchemaError::JoinEndpoint {
                through: through.clone(),
                message: format!("no foreign key to {}", owner_model),
            })?;

        let related_fk = join
            .fields
            .iter()
            .find(|f| f.points_at(related) && f.name != owner_fk.name)
            .ok_or_else(|| SchemaError::JoinEndpoint {
                through: through.clone(),
                message: format!("no foreign key to {}", related),
            })?;

        Ok((owner_fk, related_fk))
    }
}

/// In-memory model registry
#[derive(Debug, Clone, Default)]
pub struct Schema {
    models: BTreeMap<String, ModelDescriptor>,
}

impl SchemaRegistry for Schema {
    fn model(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.get(name)
    }
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    models: BTreeMap<String, ModelDef>,
}

#[derive(Debug, Deserialize)]
struct ModelDef {
    #[serde(default)]
    fields: Vec<FieldDef>,
}

#[derive(Debug, Deserialize)]
struct FieldDef {
    name: String,
    kind: String,
    #[serde(default = "default_nullable")]
    nullable: bool,
    #[serde(default)]
    unique: bool,
    related: Option<String>,
    through: Option<String>,
    through_fields: Option<[String; 2]>,
}

fn default_nullable() -> bool {
    true
}

/// Kind names accepted in definition files
enum KindName {
    Scalar(ScalarKind),
    ForeignKey,
    ManyToMany,
}

/// Map a kind name (snake_case or Django-style field class) to a kind
fn parse_kind(kind: &str) -> Option<KindName> {
    let name = kind.trim().to_lowercase();
    let kind = match name.as_str() {
        "text" | "string" | "char" | "charfield" | "textfield" | "emailfield" | "slugfield"
        | "urlfield" | "booleanfield" => KindName::Scalar(ScalarKind::Text),
        "integer" | "int" | "integerfield" | "bigintegerfield" | "smallintegerfield"
        | "autofield" => KindName::Scalar(ScalarKind::Integer),
        "positive_integer" | "positiveintegerfield" | "positivesmallintegerfield" => {
            KindName::Scalar(ScalarKind::PositiveInteger)
        }
        "float" | "decimal" | "floatfield" | "decimalfield" => KindName::Scalar(ScalarKind::Float),
        "date" | "datetime" | "datefield" | "datetimefield" => KindName::Scalar(ScalarKind::Date),
        "foreign_key" | "foreignkey" | "fk" => KindName::ForeignKey,
        "many_to_many" | "manytomany" | "manytomanyfield" | "m2m" => KindName::ManyToMany,
        _ => return None,
    };
    Some(kind)
}

impl Schema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model (builder style)
    pub fn with_model(mut self, model: ModelDescriptor) -> Self {
        self.models.insert(model.name.clone(), model);
        self
    }

    /// Names of all registered models
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(|k| k.as_str())
    }

    /// Load a schema definition file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to load schema file: {}", path.display()))
    }

    /// Parse a schema definition from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile =
            toml::from_str(content).map_err(|e| SchemaError::Parse(e.to_string()))?;

        let mut schema = Schema::new();
        for (model_name, def) in &file.models {
            let mut model = ModelDescriptor::new(model_name.clone());
            for field in &def.fields {
                model.fields.push(Self::field_from_def(model_name, field)?);
            }
            schema.models.insert(model_name.clone(), model);
        }

        schema.check_references()?;

        log::debug!("Loaded schema with {} models", schema.models.len());
        Ok(schema)
    }

    fn field_from_def(model: &str, def: &FieldDef) -> Result<FieldDescriptor, SchemaError> {
        let kind_name = parse_kind(&def.kind).ok_or_else(|| SchemaError::InvalidKind {
            model: model.to_string(),
            field: def.name.clone(),
            kind: def.kind.clone(),
        })?;

        let related = || {
            def.related.clone().ok_or_else(|| SchemaError::MissingRelated {
                model: model.to_string(),
                field: def.name.clone(),
            })
        };

        let kind = match kind_name {
            KindName::Scalar(scalar) => FieldKind::Scalar(scalar),
            KindName::ForeignKey => FieldKind::ForeignKey { related: related()? },
            KindName::ManyToMany => FieldKind::ManyToMany {
                related: related()?,
                through: def.through.clone(),
                through_fields: def
                    .through_fields
                    .clone()
                    .map(|[owner, related]| (owner, related)),
            },
        };

        Ok(FieldDescriptor {
            name: def.name.clone(),
            kind,
            nullable: def.nullable,
            unique: def.unique,
        })
    }

    /// Every related/through model must itself be registered
    fn check_references(&self) -> Result<(), SchemaError> {
        for model in self.models.values() {
            for field in &model.fields {
                let mut referenced: Vec<&String> = Vec::new();
                match &field.kind {
                    FieldKind::Scalar(_) => {}
                    FieldKind::ForeignKey { related } => referenced.push(related),
                    FieldKind::ManyToMany { related, through, .. } => {
                        referenced.push(related);
                        referenced.extend(through.iter());
                    }
                }
                for name in referenced {
                    if !self.models.contains_key(name) {
                        return Err(SchemaError::UnknownModel {
                            model: name.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
