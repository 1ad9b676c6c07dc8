use crate::allocation::CandidatePool;
use crate::definition::ResolvedDefinition;
use crate::diagnostics::{report, Diagnostic, DiagnosticSink};
use crate::domain::NodeId;
use crate::error::{BindingError, RuntimeError};
use crate::instance::ComponentInstance;
use crate::options::RuntimeOptions;
use crate::ports::HostTree;

/// Where a component looks for its surface node.
#[derive(Debug, Clone, Copy)]
pub enum Owner<'a> {
    /// First unclaimed matching node among the parent's descendants.
    Parent(&'a ComponentInstance),
    /// Adopt this node directly.
    Node(NodeId),
    /// First unclaimed matching node anywhere under the presentation root.
    Root,
}

pub(crate) struct SurfaceBinder<'a, H> {
    pub host: &'a H,
    pub options: &'a RuntimeOptions,
    pub diagnostics: Option<&'a DiagnosticSink>,
}

impl<H: HostTree> SurfaceBinder<'_, H> {
    pub fn resolve(
        &self,
        definition: &ResolvedDefinition,
        owner: Owner<'_>,
    ) -> Result<NodeId, RuntimeError> {
        let (scope, parent) = match owner {
            Owner::Node(node) => return Ok(node),
            Owner::Parent(instance) => (instance.node(), describe(instance)),
            Owner::Root => {
                let root = self.host.root()?;
                (root, format!("document root {root}"))
            }
        };
        let mut pool = CandidatePool::snapshot(
            self.host,
            scope,
            &definition.tag,
            &self.options.claimed_attribute,
        )?;
        pool.next_unclaimed(self.host, &self.options.claimed_attribute)?
            .ok_or_else(|| {
                BindingError {
                    tag: definition.tag.clone(),
                    parent,
                }
                .into()
            })
    }

    pub fn is_claimed(&self, node: NodeId) -> Result<bool, RuntimeError> {
        Ok(self
            .host
            .attribute(node, &self.options.claimed_attribute)?
            .is_some())
    }

    /// Claims `node` for `definition` and applies its flattened styles.
    ///
    /// Returns the styles the node did not carry before, which is what
    /// [`SurfaceBinder::release`] takes off again.
    pub fn bind(
        &self,
        definition: &ResolvedDefinition,
        node: NodeId,
    ) -> Result<Vec<String>, RuntimeError> {
        if self.is_claimed(node)? {
            return Err(RuntimeError::AlreadyClaimed {
                node: node.to_string(),
            });
        }
        self.host
            .set_attribute(node, &self.options.claimed_attribute, "")?;
        let existing = self.host.styles(node)?;
        let mut added = Vec::new();
        for style in &definition.styles {
            if !existing.contains(style) {
                self.host.add_style(node, style)?;
                added.push(style.clone());
            }
        }
        tracing::debug!(definition = %definition.type_name, node = %node, "surface node claimed");
        if !definition.styles.is_empty() {
            report(
                self.diagnostics,
                Diagnostic::StylesApplied {
                    tag: definition.tag.clone(),
                    styles: definition.styles.clone(),
                },
            );
        }
        Ok(added)
    }

    /// Undoes [`SurfaceBinder::bind`] so the node is a candidate again.
    pub fn release(&self, node: NodeId, added_styles: &[String]) -> Result<(), RuntimeError> {
        self.host
            .remove_attribute(node, &self.options.claimed_attribute)?;
        for style in added_styles {
            self.host.remove_style(node, style)?;
        }
        Ok(())
    }
}

pub(crate) fn describe(instance: &ComponentInstance) -> String {
    format!("<{}> {}", instance.definition().tag, instance.node())
}
