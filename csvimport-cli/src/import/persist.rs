//! Save a pending entity tree
//!
//! Order per node: foreign-key children, dedup lookup or create, scalar
//! values, foreign-key links, save, then many-to-many children. Foreign keys
//! have to exist before the owner can reference them and many-to-many links
//! need the owner's identity.

use super::dedup;
use super::errors::PersistError;
use super::{PendingNode, RunLog};
use crate::config::RunConfig;
use crate::schema::{FieldDescriptor, FieldKind, SchemaRegistry};
use crate::store::{Attribute, Record, Store};

/// Persists trees against a store
pub struct TreePersister<'a, S: SchemaRegistry, St: Store + ?Sized> {
    schema: &'a S,
    store: &'a mut St,
    config: &'a RunConfig,
}

impl<'a, S: SchemaRegistry, St: Store + ?Sized> TreePersister<'a, S, St> {
    pub fn new(schema: &'a S, store: &'a mut St, config: &'a RunConfig) -> Self {
        TreePersister {
            schema,
            store,
            config,
        }
    }

    /// Persist a node and everything below it, returning its saved record
    ///
    /// A node that is already resolved is returned as is. Failures of
    /// foreign-key or many-to-many children are logged; only a failure to
    /// save this node itself is returned.
    pub fn persist(&mut self, node: &mut PendingNode, log: &mut RunLog) -> Result<Record, PersistError> {
        if let Some(record) = node.resolved() {
            return Ok(record.clone());
        }
        let model = node.model().to_string();

        for child in node.foreign_keys_mut() {
            if let Err(e) = self.persist(&mut child.node, log) {
                log.push(format!("Couldnt create fk {} for {}: {}", child.field.name, model, e));
            }
        }

        let existing = if self.config.deduplicate {
            dedup::resolve(&*self.store, node).map_err(|e| PersistError::dedup(&model, e))?
        } else {
            None
        };

        let mut record = match existing {
            Some(record) => record,
            None => self
                .store
                .create(&model)
                .map_err(|e| PersistError::store(&model, e))?,
        };

        for entry in node.scalars() {
            let value = Attribute::Value(entry.value.clone());
            if let Err(e) = self.store.set_attribute(&mut record, &entry.field, value) {
                log.push(format!("Field {} of {} not set: {}", entry.field.name, model, e));
            }
        }

        for child in node.foreign_keys() {
            let Some(id) = child.node.resolved().and_then(|r| r.id()) else {
                continue;
            };
            if let Err(e) = self
                .store
                .set_attribute(&mut record, &child.field, Attribute::Ref(id))
            {
                log.push(format!("Couldnt link fk {} for {}: {}", child.field.name, model, e));
            }
        }

        self.store
            .save(&mut record)
            .map_err(|e| PersistError::store(&model, e))?;

        if node.set_resolved(record.clone()).is_err() {
            log::debug!("{} was resolved twice", record);
        }

        for group in node.many_to_many_groups_mut() {
            for (index, child) in group.children.iter_mut() {
                if let Err(e) = self.link(&record, &group.field, child, log) {
                    log.push(format!(
                        "Couldnt link m2m {}.{} for {}: {}",
                        group.field.name, index, model, e
                    ));
                }
            }
        }

        Ok(record)
    }

    /// Persist a many-to-many child and link it to its saved owner
    fn link(
        &mut self,
        owner: &Record,
        field: &FieldDescriptor,
        child: &mut PendingNode,
        log: &mut RunLog,
    ) -> Result<(), PersistError> {
        let related = self.persist(child, log)?;

        match &field.kind {
            FieldKind::ManyToMany {
                through: Some(through),
                ..
            } => {
                let schema: &'a S = self.schema;
                let (owner_fk, related_fk) = schema
                    .join_endpoints(owner.model(), field)
                    .map_err(|e| PersistError::schema(through, e))?;

                let mut join = child.take_join(through);
                join.attach_resolved(owner_fk, owner.clone());
                join.attach_resolved(related_fk, related);
                self.persist(&mut join, log)?;
            }
            _ => self
                .store
                .add_relation(owner, field, &related)
                .map_err(|e| PersistError::store(owner.model(), e))?,
        }

        Ok(())
    }
}
