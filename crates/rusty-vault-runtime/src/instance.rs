use std::sync::Arc;

use crate::definition::ResolvedDefinition;
use crate::domain::NodeId;

#[derive(Debug)]
pub enum ChildSlot {
    One(ComponentInstance),
    Many(Vec<ComponentInstance>),
}

impl ChildSlot {
    pub fn len(&self) -> usize {
        match self {
            ChildSlot::One(_) => 1,
            ChildSlot::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A live binding of one definition to exactly one surface node.
///
/// The instance does not own the node; it is an overlay over the host tree that
/// also records the child instances wired into named fields.
#[derive(Debug)]
pub struct ComponentInstance {
    definition: Arc<ResolvedDefinition>,
    node: NodeId,
    fields: Vec<(String, ChildSlot)>,
}

impl ComponentInstance {
    pub(crate) fn new(definition: Arc<ResolvedDefinition>, node: NodeId) -> Self {
        Self {
            definition,
            node,
            fields: Vec::new(),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn definition(&self) -> &ResolvedDefinition {
        &self.definition
    }

    pub(crate) fn shared_definition(&self) -> Arc<ResolvedDefinition> {
        Arc::clone(&self.definition)
    }

    pub(crate) fn into_fields(self) -> Vec<(String, ChildSlot)> {
        self.fields
    }

    pub fn type_name(&self) -> &str {
        &self.definition.type_name
    }

    pub fn field(&self, name: &str) -> Option<&ChildSlot> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, slot)| slot)
    }

    pub fn child(&self, name: &str) -> Option<&ComponentInstance> {
        match self.field(name)? {
            ChildSlot::One(instance) => Some(instance),
            ChildSlot::Many(_) => None,
        }
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut ComponentInstance> {
        match self.field_mut(name)? {
            ChildSlot::One(instance) => Some(instance),
            ChildSlot::Many(_) => None,
        }
    }

    pub fn children(&self, name: &str) -> &[ComponentInstance] {
        match self.field(name) {
            Some(ChildSlot::Many(items)) => items,
            _ => &[],
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Depth-first, left-to-right walk over this instance and all descendants.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a ComponentInstance)) {
        visit(self);
        for (_, slot) in &self.fields {
            match slot {
                ChildSlot::One(child) => child.walk(visit),
                ChildSlot::Many(items) => {
                    for child in items {
                        child.walk(visit);
                    }
                }
            }
        }
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut ChildSlot> {
        self.fields
            .iter_mut()
            .find(|(field, _)| field == name)
            .map(|(_, slot)| slot)
    }

    /// Assigns a field, replacing an earlier value under the same name.
    pub(crate) fn assign(&mut self, name: String, slot: ChildSlot) {
        match self.field_mut(&name) {
            Some(existing) => *existing = slot,
            None => self.fields.push((name, slot)),
        }
    }

    pub(crate) fn extend_many(&mut self, name: String, items: Vec<ComponentInstance>) {
        match self.field_mut(&name) {
            Some(ChildSlot::Many(existing)) => existing.extend(items),
            _ => self.assign(name, ChildSlot::Many(items)),
        }
    }
}
