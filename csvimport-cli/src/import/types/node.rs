//! Pending entity tree built per row
//!
//! A [`PendingNode`] is one record that has not been persisted yet, together
//! with the values the row assigns to it and the related records reached
//! through foreign-key and many-to-many hops. Each row owns its own tree;
//! children are owned by their parent and nothing points back up.

use std::collections::BTreeMap;

use once_cell::unsync::OnceCell;

use super::Value;
use crate::schema::FieldDescriptor;
use crate::store::Record;

/// A cleaned value for one field
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarEntry {
    pub field: FieldDescriptor,
    pub value: Value,
}

/// The related record reached through a foreign key
#[derive(Debug)]
pub struct ForeignKeyChild {
    pub field: FieldDescriptor,
    pub node: PendingNode,
}

/// Related records reached through a many-to-many field, keyed by group index
#[derive(Debug)]
pub struct ManyToManyGroup {
    pub field: FieldDescriptor,
    pub children: BTreeMap<usize, PendingNode>,
}

/// A record waiting to be persisted
#[derive(Debug)]
pub struct PendingNode {
    model: String,
    scalars: BTreeMap<String, ScalarEntry>,
    foreign_keys: BTreeMap<String, ForeignKeyChild>,
    many_to_many: BTreeMap<String, ManyToManyGroup>,
    /// Join record for many-to-many relations with their own model
    join: Option<Box<PendingNode>>,
    /// Set once, after the record is saved
    resolved: OnceCell<Record>,
}

impl PendingNode {
    /// Create an empty node for a model
    pub fn new(model: impl Into<String>) -> Self {
        PendingNode {
            model: model.into(),
            scalars: BTreeMap::new(),
            foreign_keys: BTreeMap::new(),
            many_to_many: BTreeMap::new(),
            join: None,
            resolved: OnceCell::new(),
        }
    }

    /// Qualified model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Store a value for a field, replacing any earlier one
    pub fn set_value(&mut self, field: &FieldDescriptor, value: Value) {
        self.scalars.insert(
            field.name.clone(),
            ScalarEntry {
                field: field.clone(),
                value,
            },
        );
    }

    /// Get the value stored for a field
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.scalars.get(field).map(|e| &e.value)
    }

    /// All stored values, ordered by field name
    pub fn scalars(&self) -> impl Iterator<Item = &ScalarEntry> {
        self.scalars.values()
    }

    /// Get or create the node behind a foreign key
    pub fn foreign_key_child(&mut self, field: &FieldDescriptor, related: &str) -> &mut PendingNode {
        &mut self
            .foreign_keys
            .entry(field.name.clone())
            .or_insert_with(|| ForeignKeyChild {
                field: field.clone(),
                node: PendingNode::new(related),
            })
            .node
    }

    /// Attach an already-saved record behind a foreign key
    ///
    /// Used for join records, whose endpoints are known before they are
    /// persisted.
    pub fn attach_resolved(&mut self, field: &FieldDescriptor, record: Record) {
        let node = PendingNode::new(record.model());
        let _ = node.resolved.set(record);
        self.foreign_keys.insert(
            field.name.clone(),
            ForeignKeyChild {
                field: field.clone(),
                node,
            },
        );
    }

    /// Get the node behind a foreign key
    pub fn foreign_key(&self, field: &str) -> Option<&PendingNode> {
        self.foreign_keys.get(field).map(|c| &c.node)
    }

    /// All foreign-key children, ordered by field name
    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKeyChild> {
        self.foreign_keys.values()
    }

    /// All foreign-key children, mutable
    pub fn foreign_keys_mut(&mut self) -> impl Iterator<Item = &mut ForeignKeyChild> {
        self.foreign_keys.values_mut()
    }

    /// Get or create the node for a many-to-many group index
    ///
    /// When `through` is given the new node also gets an empty join node of
    /// that model.
    pub fn many_to_many_child(
        &mut self,
        field: &FieldDescriptor,
        index: usize,
        related: &str,
        through: Option<&str>,
    ) -> &mut PendingNode {
        let group = self
            .many_to_many
            .entry(field.name.clone())
            .or_insert_with(|| ManyToManyGroup {
                field: field.clone(),
                children: BTreeMap::new(),
            });

        group.children.entry(index).or_insert_with(|| {
            let mut node = PendingNode::new(related);
            node.join = through.map(|model| Box::new(PendingNode::new(model)));
            node
        })
    }

    /// Get the many-to-many node for a field and group index
    pub fn many_to_many(&self, field: &str, index: usize) -> Option<&PendingNode> {
        self.many_to_many.get(field)?.children.get(&index)
    }

    /// All many-to-many groups, ordered by field name
    pub fn many_to_many_groups(&self) -> impl Iterator<Item = &ManyToManyGroup> {
        self.many_to_many.values()
    }

    /// All many-to-many groups, mutable
    pub fn many_to_many_groups_mut(&mut self) -> impl Iterator<Item = &mut ManyToManyGroup> {
        self.many_to_many.values_mut()
    }

    /// Join node, for many-to-many children backed by a join model
    pub fn join(&self) -> Option<&PendingNode> {
        self.join.as_deref()
    }

    /// Get or create the join node
    pub fn join_child(&mut self, model: &str) -> &mut PendingNode {
        self.join
            .get_or_insert_with(|| Box::new(PendingNode::new(model)))
    }

    /// Take the join node out, creating an empty one of `model` if missing
    pub fn take_join(&mut self, model: &str) -> PendingNode {
        self.join
            .take()
            .map(|b| *b)
            .unwrap_or_else(|| PendingNode::new(model))
    }

    /// The saved record, once persisted
    pub fn resolved(&self) -> Option<&Record> {
        self.resolved.get()
    }

    /// Record the saved record; fails if the node was already resolved
    pub fn set_resolved(&self, record: Record) -> Result<(), Record> {
        self.resolved.set(record)
    }

    /// Check if nothing has been assigned to this node or below it
    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty()
            && self.foreign_keys.is_empty()
            && self.many_to_many.is_empty()
            && self.join.as_ref().is_none_or(|j| j.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, ScalarKind};
    use crate::store::RecordId;

    fn text_field(name: &str) -> FieldDescriptor {
        FieldDescriptor::new(name, FieldKind::Scalar(ScalarKind::Text))
    }

    fn fk_field(name: &str, related: &str) -> FieldDescriptor {
        FieldDescriptor::new(
            name,
            FieldKind::ForeignKey {
                related: related.into(),
            },
        )
    }

    fn m2m_field(name: &str, related: &str) -> FieldDescriptor {
        FieldDescriptor::new(
            name,
            FieldKind::ManyToMany {
                related: related.into(),
                through: None,
                through_fields: None,
            },
        )
    }

    #[test]
    fn test_last_write_wins() {
        let mut node = PendingNode::new("shop.Item");
        let name = text_field("name");
        node.set_value(&name, Value::String("first".into()));
        node.set_value(&name, Value::String("second".into()));
        assert_eq!(node.scalars().count(), 1);
        assert_eq!(node.value("name"), Some(&Value::String("second".into())));
    }

    #[test]
    fn test_foreign_key_child_reused() {
        let mut node = PendingNode::new("shop.Item");
        let category = fk_field("category", "shop.Category");
        node.foreign_key_child(&category, "shop.Category")
            .set_value(&text_field("title"), Value::String("Tools".into()));
        node.foreign_key_child(&category, "shop.Category")
            .set_value(&text_field("code"), Value::String("T".into()));

        assert_eq!(node.foreign_keys().count(), 1);
        let child = node.foreign_key("category").unwrap();
        assert_eq!(child.model(), "shop.Category");
        assert_eq!(child.scalars().count(), 2);
    }

    #[test]
    fn test_many_to_many_groups_by_index() {
        let mut node = PendingNode::new("shop.Item");
        let tags = m2m_field("tags", "shop.Tag");
        let name = text_field("name");
        node.many_to_many_child(&tags, 0, "shop.Tag", None)
            .set_value(&name, Value::String("urgent".into()));
        node.many_to_many_child(&tags, 1, "shop.Tag", None)
            .set_value(&name, Value::String("later".into()));
        node.many_to_many_child(&tags, 0, "shop.Tag", None)
            .set_value(&text_field("colour"), Value::String("red".into()));

        let group = node.many_to_many_groups().next().unwrap();
        assert_eq!(group.children.len(), 2);
        assert_eq!(node.many_to_many("tags", 0).unwrap().scalars().count(), 2);
        assert!(node.many_to_many("tags", 0).unwrap().join().is_none());
    }

    #[test]
    fn test_many_to_many_with_join_model() {
        let mut node = PendingNode::new("shop.Item");
        let tags = m2m_field("tags", "shop.Tag");
        let child = node.many_to_many_child(&tags, 0, "shop.Tag", Some("shop.ItemTag"));
        assert_eq!(child.join().unwrap().model(), "shop.ItemTag");
        assert_eq!(child.take_join("shop.ItemTag").model(), "shop.ItemTag");
        assert!(child.join().is_none());
    }

    #[test]
    fn test_resolved_set_once() {
        let node = PendingNode::new("shop.Item");
        let mut record = Record::new("shop.Item");
        record.assign_id(RecordId(1));
        assert!(node.set_resolved(record.clone()).is_ok());
        assert!(node.set_resolved(record).is_err());
        assert_eq!(node.resolved().unwrap().id(), Some(RecordId(1)));
    }

    #[test]
    fn test_attach_resolved() {
        let mut join = PendingNode::new("shop.ItemTag");
        let mut item = Record::new("shop.Item");
        item.assign_id(RecordId(5));
        join.attach_resolved(&fk_field("item", "shop.Item"), item);

        let child = join.foreign_key("item").unwrap();
        assert_eq!(child.resolved().and_then(|r| r.id()), Some(RecordId(5)));
        assert!(!join.is_empty());
    }
}
