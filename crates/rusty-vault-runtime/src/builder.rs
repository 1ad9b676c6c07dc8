use std::cell::RefCell;
use std::sync::Arc;

use serde_json::Value;

use crate::allocation::CandidatePool;
use crate::binder::{describe, SurfaceBinder};
use crate::definition::{ChildDeclaration, DefinitionRegistry, ResolvedDefinition};
use crate::diagnostics::{report, Diagnostic, DiagnosticSink};
use crate::domain::NodeId;
use crate::error::{BindingError, RuntimeError};
use crate::instance::{ChildSlot, ComponentInstance};
use crate::naming::{field_name_with, repeated_field_name_with};
use crate::options::RuntimeOptions;
use crate::ports::HostTree;
use crate::template::{self, MergeRecord};

enum Undo {
    Claim { node: NodeId, styles: Vec<String> },
    Merge(MergeRecord),
}

/// Depth-first, left-to-right construction of a component subtree.
///
/// Claims and template merges are journaled: a failed construction hands its
/// nodes back with [`TreeBuilder::rollback`], a successful one frees the content
/// its merges left behind with [`TreeBuilder::commit`].
pub(crate) struct TreeBuilder<'a, H> {
    host: &'a H,
    registry: &'a DefinitionRegistry,
    options: &'a RuntimeOptions,
    diagnostics: Option<&'a DiagnosticSink>,
    journal: RefCell<Vec<Undo>>,
}

impl<'a, H: HostTree> TreeBuilder<'a, H> {
    pub fn new(
        host: &'a H,
        registry: &'a DefinitionRegistry,
        options: &'a RuntimeOptions,
        diagnostics: Option<&'a DiagnosticSink>,
    ) -> Self {
        Self {
            host,
            registry,
            options,
            diagnostics,
            journal: RefCell::new(Vec::new()),
        }
    }

    fn binder(&self) -> SurfaceBinder<'_, H> {
        SurfaceBinder {
            host: self.host,
            options: self.options,
            diagnostics: self.diagnostics,
        }
    }

    /// Claims `node` and builds `definition` over it.
    pub fn bind_and_build(
        &self,
        definition: &Arc<ResolvedDefinition>,
        node: NodeId,
        args: &Value,
    ) -> Result<ComponentInstance, RuntimeError> {
        let added = self.binder().bind(definition, node)?;
        self.journal
            .borrow_mut()
            .push(Undo::Claim { node, styles: added });
        self.build(Arc::clone(definition), node, args)
    }

    /// Reverts every claim and merge made by this builder, newest first.
    pub fn rollback(&self) -> usize {
        let journal = std::mem::take(&mut *self.journal.borrow_mut());
        let binder = self.binder();
        let mut reverted = 0usize;
        for entry in journal.into_iter().rev() {
            let result = match entry {
                Undo::Claim { node, styles } => binder.release(node, &styles),
                Undo::Merge(record) => record.revert(self.host).map_err(RuntimeError::from),
            };
            match result {
                Ok(()) => reverted += 1,
                Err(e) => tracing::warn!(error = %e, "failed to revert construction step"),
            }
        }
        reverted
    }

    /// Frees content that merges detached for good.
    pub fn commit(&self) {
        let journal = std::mem::take(&mut *self.journal.borrow_mut());
        for entry in journal {
            if let Undo::Merge(record) = entry {
                if let Err(e) = self.host.discard(record.orphaned()) {
                    tracing::warn!(node = %record.node, error = %e, "failed to free merged-out content");
                }
            }
        }
    }

    fn build(
        &self,
        definition: Arc<ResolvedDefinition>,
        node: NodeId,
        args: &Value,
    ) -> Result<ComponentInstance, RuntimeError> {
        if let Some(record) = template::merge(
            self.host,
            &self.options.slot_attribute,
            self.diagnostics,
            &definition,
            node,
        )? {
            tracing::debug!(node = %node, outcome = ?record.outcome, "template merged");
            self.journal.borrow_mut().push(Undo::Merge(record));
        }

        let mut instance = ComponentInstance::new(Arc::clone(&definition), node);
        for declaration in &definition.children {
            self.build_declaration(&mut instance, declaration)?;
        }

        if let Some(hook) = definition.on_create() {
            hook(&mut instance, args);
        }
        Ok(instance)
    }

    pub fn build_declaration(
        &self,
        owner: &mut ComponentInstance,
        declaration: &ChildDeclaration,
    ) -> Result<usize, RuntimeError> {
        let child_definition = self.registry.get(declaration.definition())?;
        let claimed = &self.options.claimed_attribute;
        let mut pool =
            CandidatePool::snapshot(self.host, owner.node(), &child_definition.tag, claimed)?;

        let (field, count) = match declaration {
            ChildDeclaration::Single(name) => {
                let node = pool.next_unclaimed(self.host, claimed)?.ok_or_else(|| {
                    BindingError {
                        tag: child_definition.tag.clone(),
                        parent: describe(owner),
                    }
                })?;
                let child = self.bind_and_build(&child_definition, node, &Value::Null)?;
                let field = field_name_with(name, &self.options.field_sigil);
                owner.assign(field.clone(), ChildSlot::One(child));
                (field, 1)
            }
            ChildDeclaration::Repeated(name) => {
                let mut items = Vec::with_capacity(pool.len());
                while let Some(node) = pool.next_unclaimed(self.host, claimed)? {
                    items.push(self.bind_and_build(&child_definition, node, &Value::Null)?);
                }
                let field = repeated_field_name_with(
                    name,
                    &self.options.field_sigil,
                    &self.options.plural_suffix,
                );
                let count = items.len();
                owner.extend_many(field.clone(), items);
                (field, count)
            }
        };

        report(
            self.diagnostics,
            Diagnostic::ChildrenBuilt {
                owner: owner.type_name().to_owned(),
                field,
                count,
            },
        );
        Ok(count)
    }
}
