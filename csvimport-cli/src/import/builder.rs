//! Build a pending entity tree from one CSV row
//!
//! Each mapping entry is resolved against the schema first and only then
//! applied, so an entry that fails (unknown field, missing index, bad date)
//! leaves the tree exactly as it was.

use super::clean::clean;
use super::errors::EntryError;
use super::{ColumnResolver, FieldPath, MappingEntry, PendingNode, RunLog};
use crate::config::RunConfig;
use crate::schema::{FieldDescriptor, FieldKind, ScalarKind, SchemaError, SchemaRegistry};

/// One step from a node to a child node
#[derive(Debug, Clone)]
enum Hop<'a> {
    ForeignKey {
        field: &'a FieldDescriptor,
        related: &'a str,
    },
    ManyToMany {
        field: &'a FieldDescriptor,
        index: usize,
        related: &'a str,
        through: Option<&'a str>,
    },
    /// Into the join record of the current many-to-many child
    Join { model: &'a str },
}

/// A path checked against the schema
#[derive(Debug)]
struct ResolvedPath<'a> {
    hops: Vec<Hop<'a>>,
    target: &'a FieldDescriptor,
    kind: ScalarKind,
}

/// Check if any mapped cell of the row holds more than whitespace
fn has_values(mappings: &[MappingEntry], row: &[String], columns: &ColumnResolver) -> bool {
    mappings.iter().any(|mapping| {
        columns
            .cell(row, &mapping.column)
            .is_ok_and(|cell| !cell.trim().is_empty())
    })
}

/// Walks mapping paths and fills in pending nodes
pub struct TreeBuilder<'a, S: SchemaRegistry> {
    schema: &'a S,
    config: &'a RunConfig,
}

impl<'a, S: SchemaRegistry> TreeBuilder<'a, S> {
    pub fn new(schema: &'a S, config: &'a RunConfig) -> Self {
        TreeBuilder { schema, config }
    }

    /// Build the tree for one row
    ///
    /// Defaults are applied first so the row's own cells win. Entries whose
    /// cell is empty are skipped without touching the tree; entries that
    /// fail are logged and skipped. A row with no non-empty mapped cell
    /// yields an empty tree, defaults included.
    pub fn build(
        &self,
        mappings: &[MappingEntry],
        row: &[String],
        columns: &ColumnResolver,
        log: &mut RunLog,
    ) -> PendingNode {
        let mut root = PendingNode::new(self.config.model.clone());
        if !has_values(mappings, row, columns) {
            return root;
        }

        let label = self
            .schema
            .model(&self.config.model)
            .map(|m| m.short_name())
            .unwrap_or(&self.config.model);

        for default in &self.config.defaults {
            if let Err(e) = self.apply(&mut root, &default.path, &default.value, log) {
                log.push(format!(
                    "Default {}={} skipped: {}",
                    default.path, default.value, e
                ));
            }
        }

        for mapping in mappings {
            let cell = match columns.cell(row, &mapping.column) {
                Ok(cell) => cell,
                Err(e) => {
                    log.push(format!("Mapping {} skipped: {}", mapping, e));
                    continue;
                }
            };

            if cell.trim().is_empty() {
                continue;
            }

            log::debug!("{}.{} = \"{}\"", label, mapping.path, cell);

            if let Err(e) = self.apply(&mut root, &mapping.path, cell, log) {
                log.push(format!("Mapping {} skipped: {}", mapping, e));
            }
        }

        root
    }

    /// Resolve a path, clean the cell, then write it into the tree
    fn apply(
        &self,
        root: &mut PendingNode,
        path: &FieldPath,
        cell: &str,
        log: &mut RunLog,
    ) -> Result<(), EntryError> {
        let config: &'a RunConfig = self.config;
        let resolved = self.resolve(config.model.as_str(), path.segments())?;

        let value = clean(
            cell,
            resolved.kind,
            &resolved.target.name,
            &self.config.date_format,
            log,
        )
        .map_err(|error| EntryError::InvalidValue {
            field: resolved.target.name.clone(),
            error,
        })?;

        let mut node = root;
        for hop in &resolved.hops {
            node = match hop {
                Hop::ForeignKey { field, related } => node.foreign_key_child(field, related),
                Hop::ManyToMany {
                    field,
                    index,
                    related,
                    through,
                } => node.many_to_many_child(field, *index, related, *through),
                Hop::Join { model } => node.join_child(model),
            };
        }
        node.set_value(resolved.target, value);
        Ok(())
    }

    /// Walk path segments against the schema, starting at `model`
    fn resolve(&self, model: &'a str, segments: &[String]) -> Result<ResolvedPath<'a>, EntryError> {
        let schema: &'a S = self.schema;
        let mut model = model;
        let mut join: Option<&'a str> = None;
        let mut hops = Vec::new();
        let mut rest = segments;

        while let Some((name, tail)) = rest.split_first() {
            let field = match schema.field(model, name) {
                Ok(field) => field,
                Err(SchemaError::NoSuchField { .. }) => match join.take() {
                    // Fields the related model lacks may belong to the join record
                    Some(join_model) if schema.field(join_model, name).is_ok() => {
                        hops.push(Hop::Join { model: join_model });
                        model = join_model;
                        continue;
                    }
                    _ => {
                        return Err(EntryError::NoSuchField {
                            model: model.to_string(),
                            field: name.clone(),
                        });
                    }
                },
                Err(e) => return Err(EntryError::Schema(e)),
            };
            join = None;

            match &field.kind {
                FieldKind::ForeignKey { related } => {
                    if tail.is_empty() {
                        return Err(EntryError::IncompleteForeignKey {
                            field: field.name.clone(),
                        });
                    }
                    hops.push(Hop::ForeignKey {
                        field,
                        related: related.as_str(),
                    });
                    model = related.as_str();
                    rest = tail;
                }
                FieldKind::ManyToMany {
                    related, through, ..
                } => {
                    let missing_index = || EntryError::MissingIndex {
                        field: field.name.clone(),
                    };
                    let (index, tail) = tail.split_first().ok_or_else(missing_index)?;
                    let index: usize = index.trim().parse().map_err(|_| missing_index())?;
                    if tail.is_empty() {
                        return Err(EntryError::IncompleteManyToMany {
                            field: field.name.clone(),
                            index,
                        });
                    }
                    hops.push(Hop::ManyToMany {
                        field,
                        index,
                        related: related.as_str(),
                        through: through.as_deref(),
                    });
                    model = related.as_str();
                    join = through.as_deref();
                    rest = tail;
                }
                FieldKind::Scalar(kind) => {
                    // Segments after a scalar field carry no meaning; ignore them
                    if !tail.is_empty() {
                        log::debug!(
                            "Ignoring trailing segments {:?} after field {}",
                            tail,
                            field.name
                        );
                    }
                    return Ok(ResolvedPath {
                        hops,
                        target: field,
                        kind: *kind,
                    });
                }
            }
        }

        // Only reachable for an empty path
        Err(EntryError::NoSuchField {
            model: model.to_string(),
            field: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::fixtures::{row, shop_schema};
    use crate::import::{parse_defaults, parse_mappings, Value};
    use crate::schema::Schema;

    fn config(mappings: &str) -> RunConfig {
        RunConfig::builder("shop.Item")
            .mappings(parse_mappings(mappings).unwrap())
            .build()
    }

    fn build(schema: &Schema, config: &RunConfig, cells: &[&str]) -> (PendingNode, RunLog) {
        let mut log = RunLog::new();
        let tree = TreeBuilder::new(schema, config).build(
            &config.mappings,
            &row(cells),
            &ColumnResolver::Positional,
            &mut log,
        );
        (tree, log)
    }

    #[test]
    fn test_scalar_and_foreign_key() {
        let schema = shop_schema();
        let config = config("column1=name,column2=category.title");
        let (tree, log) = build(&schema, &config, &["Widget", "Tools"]);

        assert!(log.is_empty());
        assert_eq!(tree.value("name"), Some(&Value::String("Widget".into())));
        let category = tree.foreign_key("category").unwrap();
        assert_eq!(category.model(), "shop.Category");
        assert_eq!(category.value("title"), Some(&Value::String("Tools".into())));
    }

    #[test]
    fn test_empty_cell_is_noop() {
        let schema = shop_schema();
        let config = config("column1=name,column2=category.title,column3=tags.0.name");
        let (tree, log) = build(&schema, &config, &["", "  ", ""]);
        assert!(tree.is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn test_many_to_many_index() {
        let schema = shop_schema();
        let config = config("column1=tags.0.name column2=tags.1.name column3=tags.0.name");
        let (tree, log) = build(&schema, &config, &["urgent", "later", "override"]);

        assert!(log.is_empty());
        assert_eq!(
            tree.many_to_many("tags", 0).unwrap().value("name"),
            Some(&Value::String("override".into()))
        );
        assert_eq!(
            tree.many_to_many("tags", 1).unwrap().value("name"),
            Some(&Value::String("later".into()))
        );
    }

    #[test]
    fn test_many_to_many_without_index() {
        let schema = shop_schema();
        let config = config("column1=tags.name");
        let (tree, log) = build(&schema, &config, &["urgent"]);
        assert!(tree.is_empty());
        assert_eq!(log.len(), 1);
        assert!(log.messages()[0].contains("m2m tags must be followed by an index"));
    }

    #[test]
    fn test_many_to_many_terminal_index_rejected() {
        let schema = shop_schema();
        let config = config("column1=tags.0");
        let (tree, log) = build(&schema, &config, &["urgent"]);
        assert!(tree.is_empty());
        assert!(log.messages()[0].contains("must be followed by a field name after index 0"));
    }

    #[test]
    fn test_unknown_field_abandons_only_that_entry() {
        let schema = shop_schema();
        let config = config("column1=colour,column2=name,column3=category.nope");
        let (tree, log) = build(&schema, &config, &["red", "Widget", "x"]);

        assert_eq!(tree.value("name"), Some(&Value::String("Widget".into())));
        // A failing path must not leave an empty category behind
        assert!(tree.foreign_key("category").is_none());
        assert_eq!(log.len(), 2);
        assert!(log.messages()[0].contains("no such field 'colour' on shop.Item"));
        assert!(log.messages()[1].contains("no such field 'nope' on shop.Category"));
    }

    #[test]
    fn test_terminal_foreign_key_rejected() {
        let schema = shop_schema();
        let config = config("column1=category");
        let (tree, log) = build(&schema, &config, &["Tools"]);
        assert!(tree.is_empty());
        assert!(log.messages()[0].contains("foreign key category must be followed by a field name"));
    }

    #[test]
    fn test_bad_date_leaves_field_unset() {
        let schema = shop_schema();
        let config = config("column1=added,column2=name");
        let (tree, log) = build(&schema, &config, &["yesterday", "Widget"]);
        assert_eq!(tree.value("added"), None);
        assert_eq!(tree.value("name"), Some(&Value::String("Widget".into())));
        assert!(log.messages()[0].contains("null value for date"));
    }

    #[test]
    fn test_numeric_notice_keeps_row() {
        let schema = shop_schema();
        let config = config("column1=price,column2=stock");
        let (tree, log) = build(&schema, &config, &["cheap", "-4"]);
        assert_eq!(tree.value("price"), Some(&Value::Float(0.0)));
        assert_eq!(tree.value("stock"), Some(&Value::Int(0)));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_trailing_segments_after_scalar_ignored() {
        let schema = shop_schema();
        let config = config("column1=name.extra.bits");
        let (tree, log) = build(&schema, &config, &["Widget"]);
        assert!(log.is_empty());
        assert_eq!(tree.value("name"), Some(&Value::String("Widget".into())));
    }

    #[test]
    fn test_join_attributes_routed_to_join_node() {
        let schema = shop_schema();
        let config = config("column1=labels.0.name,column2=labels.0.weight");
        let (tree, log) = build(&schema, &config, &["featured", "3"]);

        assert!(log.is_empty());
        let label = tree.many_to_many("labels", 0).unwrap();
        assert_eq!(label.model(), "shop.Label");
        assert_eq!(label.value("name"), Some(&Value::String("featured".into())));
        let join = label.join().unwrap();
        assert_eq!(join.model(), "shop.ItemLabel");
        assert_eq!(join.value("weight"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_join_fields_not_reachable_without_join_model() {
        let schema = shop_schema();
        let config = config("column1=tags.0.weight");
        let (tree, log) = build(&schema, &config, &["3"]);
        assert!(tree.is_empty());
        assert!(log.messages()[0].contains("no such field 'weight' on shop.Tag"));
    }

    #[test]
    fn test_missing_cell_logged() {
        let schema = shop_schema();
        let config = config("column1=name,column4=sku");
        let (tree, log) = build(&schema, &config, &["Widget"]);
        assert_eq!(tree.value("name"), Some(&Value::String("Widget".into())));
        assert_eq!(log.len(), 1);
        assert!(log.messages()[0].contains("missing from the row"));
    }

    #[test]
    fn test_defaults_overridden_by_cells() {
        let schema = shop_schema();
        let config = RunConfig::builder("shop.Item")
            .mappings(parse_mappings("column1=category.title,column2=sku").unwrap())
            .defaults(parse_defaults("category.title=Misc,name=Unnamed").unwrap())
            .build();

        let (tree, _) = build(&schema, &config, &["Tools"]);
        assert_eq!(tree.value("name"), Some(&Value::String("Unnamed".into())));
        assert_eq!(
            tree.foreign_key("category").unwrap().value("title"),
            Some(&Value::String("Tools".into()))
        );

        let (tree, _) = build(&schema, &config, &["", "W-1"]);
        assert_eq!(
            tree.foreign_key("category").unwrap().value("title"),
            Some(&Value::String("Misc".into()))
        );
    }

    #[test]
    fn test_blank_row_gets_no_defaults() {
        let schema = shop_schema();
        let config = RunConfig::builder("shop.Item")
            .mappings(parse_mappings("column1=name,column2=sku").unwrap())
            .defaults(parse_defaults("category.title=Misc,price=0").unwrap())
            .build();

        let (tree, log) = build(&schema, &config, &["", " "]);
        assert!(tree.is_empty());
        assert!(log.is_empty());

        // Cells past the end of a short row count as empty
        let (tree, _) = build(&schema, &config, &[]);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_header_columns() {
        let schema = shop_schema();
        let config = RunConfig::builder("shop.Item")
            .mappings(parse_mappings("Name=name Category=category.title").unwrap())
            .build();
        let columns = ColumnResolver::Header(row(&["Category", "Name"]));
        let mut log = RunLog::new();
        let tree = TreeBuilder::new(&schema, &config).build(
            &config.mappings,
            &row(&["Tools", "Widget"]),
            &columns,
            &mut log,
        );
        assert_eq!(tree.value("name"), Some(&Value::String("Widget".into())));
        assert_eq!(
            tree.foreign_key("category").unwrap().value("title"),
            Some(&Value::String("Tools".into()))
        );
    }
}
