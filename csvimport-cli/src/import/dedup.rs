//! Find an existing record for a pending node
//!
//! The filter is built from the node's unique fields when any of them carry
//! a value, otherwise from its required fields that do. Resolved foreign
//! keys count as fields, matched by the related record's identity.

use super::errors::DedupError;
use super::PendingNode;
use crate::schema::FieldDescriptor;
use crate::store::{Attribute, Filter, Record, Store};

/// Candidate (field, value) pairs the node can be matched on
fn candidates(node: &PendingNode) -> Vec<(&FieldDescriptor, Attribute)> {
    let scalars = node
        .scalars()
        .filter(|entry| !entry.value.is_null())
        .map(|entry| (&entry.field, Attribute::Value(entry.value.clone())));

    let links = node.foreign_keys().filter_map(|child| {
        let id = child.node.resolved()?.id()?;
        Some((&child.field, Attribute::Ref(id)))
    });

    scalars.chain(links).collect()
}

/// Build the dedup filter; empty when nothing identifies the node
pub fn dedup_filter(node: &PendingNode) -> Filter {
    let candidates = candidates(node);

    let unique: Vec<_> = candidates.iter().filter(|(f, _)| f.unique).collect();
    let chosen = if unique.is_empty() {
        candidates.iter().filter(|(f, _)| f.is_required()).collect()
    } else {
        unique
    };

    let mut filter = Filter::new();
    for (field, value) in chosen {
        filter.exact(field.name.clone(), value.clone());
    }
    filter
}

/// Look for a saved record the node describes
///
/// Returns `None` without querying when the filter would be empty.
pub fn resolve<St: Store + ?Sized>(
    store: &St,
    node: &PendingNode,
) -> Result<Option<Record>, DedupError> {
    let filter = dedup_filter(node);
    if filter.is_empty() {
        log::debug!("No dedup fields set on {}, creating new record", node.model());
        return Ok(None);
    }

    let mut matches = store
        .query(node.model(), &filter)
        .map_err(DedupError::Store)?;

    match matches.len() {
        0 => Ok(None),
        1 => {
            let existing = matches.pop();
            if let Some(record) = &existing {
                log::debug!("Found existing {} for {}", record, filter);
            }
            Ok(existing)
        }
        n => Err(DedupError::NonUniqueMatch {
            model: node.model().to_string(),
            filter: filter.to_string(),
            matches: n,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::fixtures::shop_schema;
    use crate::import::Value;
    use crate::schema::{FieldDescriptor, FieldKind, ScalarKind, SchemaRegistry};
    use crate::store::{MemoryStore, RecordId};

    fn text(s: &str) -> Value {
        Value::String(s.into())
    }

    fn field(model: &str, name: &str) -> FieldDescriptor {
        shop_schema().field(model, name).unwrap().clone()
    }

    fn saved_category(store: &mut MemoryStore, title: &str) -> Record {
        let schema = shop_schema();
        let mut record = store.create("shop.Category").unwrap();
        store
            .set_attribute(
                &mut record,
                schema.field("shop.Category", "title").unwrap(),
                Attribute::Value(text(title)),
            )
            .unwrap();
        store.save(&mut record).unwrap();
        record
    }

    #[test]
    fn test_unique_fields_preferred() {
        let mut node = PendingNode::new("shop.Item");
        node.set_value(&field("shop.Item", "name"), text("Widget"));
        node.set_value(&field("shop.Item", "sku"), text("W-1"));

        let filter = dedup_filter(&node);
        assert_eq!(filter.to_string(), "sku__exact=W-1");
    }

    #[test]
    fn test_required_fallback_includes_resolved_foreign_keys() {
        let mut node = PendingNode::new("shop.Item");
        node.set_value(&field("shop.Item", "name"), text("Widget"));
        node.set_value(&field("shop.Item", "price"), Value::Float(2.5));

        let mut category = Record::new("shop.Category");
        category.assign_id(RecordId(7));
        node.attach_resolved(&field("shop.Item", "category"), category);

        let filter = dedup_filter(&node);
        assert_eq!(filter.to_string(), "name__exact=Widget, category__exact=#7");
    }

    #[test]
    fn test_unresolved_foreign_key_ignored() {
        let mut node = PendingNode::new("shop.Item");
        node.foreign_key_child(&field("shop.Item", "category"), "shop.Category");
        assert!(dedup_filter(&node).is_empty());
    }

    #[test]
    fn test_no_identifying_fields_skips_lookup() {
        let store = MemoryStore::new(shop_schema());
        let mut node = PendingNode::new("shop.Item");
        node.set_value(&field("shop.Item", "price"), Value::Float(1.0));
        assert_eq!(resolve(&store, &node).unwrap(), None);
    }

    #[test]
    fn test_single_match_found() {
        let mut store = MemoryStore::new(shop_schema());
        let saved = saved_category(&mut store, "Tools");
        saved_category(&mut store, "Garden");

        let mut node = PendingNode::new("shop.Category");
        node.set_value(&field("shop.Category", "title"), text("Tools"));
        assert_eq!(resolve(&store, &node).unwrap(), Some(saved));

        let mut node = PendingNode::new("shop.Category");
        node.set_value(&field("shop.Category", "title"), text("Kitchen"));
        assert_eq!(resolve(&store, &node).unwrap(), None);
    }

    #[test]
    fn test_multiple_matches_rejected() {
        // Store without the unique constraint, so duplicates can exist
        let loose = crate::schema::Schema::new().with_model(
            crate::schema::ModelDescriptor::new("shop.Category").with_field(
                FieldDescriptor::new("title", FieldKind::Scalar(ScalarKind::Text)),
            ),
        );
        let mut store = MemoryStore::new(loose);
        saved_category(&mut store, "Tools");
        saved_category(&mut store, "Tools");

        let mut node = PendingNode::new("shop.Category");
        node.set_value(&field("shop.Category", "title"), text("Tools"));
        let err = resolve(&store, &node).unwrap_err();
        assert!(matches!(err, DedupError::NonUniqueMatch { matches: 2, .. }));
    }
}
