use crate::definition::ResolvedDefinition;
use crate::diagnostics::{report, Diagnostic, DiagnosticSink};
use crate::domain::NodeId;
use crate::ports::{HostTree, PortError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Template instantiated over a node without meaningful content.
    Merged,
    /// Existing content moved into the content slot.
    Preserved { moved: usize },
    /// Existing content dropped: the template has no content slot.
    Discarded { nodes: usize },
}

/// What a merge did to a node, enough to reverse it.
#[derive(Debug)]
pub(crate) struct MergeRecord {
    pub node: NodeId,
    pub outcome: MergeOutcome,
    /// The node's children before the merge.
    pub captured: Vec<NodeId>,
}

impl MergeRecord {
    /// Captured nodes no longer referenced by the tree once the merge stands.
    pub fn orphaned(&self) -> &[NodeId] {
        if let MergeOutcome::Preserved { .. } = self.outcome {
            return &[];
        }
        &self.captured
    }

    /// Puts the captured children back and frees the template's nodes.
    pub fn revert<H: HostTree>(self, host: &H) -> Result<(), PortError> {
        let instantiated = host.take_children(self.node)?;
        host.append_children(self.node, &self.captured)?;
        host.discard(&instantiated)
    }
}

pub(crate) fn merge<H: HostTree>(
    host: &H,
    slot_attribute: &str,
    diagnostics: Option<&DiagnosticSink>,
    definition: &ResolvedDefinition,
    node: NodeId,
) -> Result<Option<MergeRecord>, PortError> {
    let Some(template) = definition.template.as_deref() else {
        return Ok(None);
    };

    let had_content = host.has_content(node)?;
    let captured = host.take_children(node)?;
    host.append_markup(node, template)?;
    if !had_content {
        return Ok(Some(MergeRecord {
            node,
            outcome: MergeOutcome::Merged,
            captured,
        }));
    }

    let outcome = match host.first_with_attribute(node, slot_attribute)? {
        Some(slot) => {
            host.append_children(slot, &captured)?;
            host.remove_attribute(slot, slot_attribute)?;
            MergeOutcome::Preserved {
                moved: captured.len(),
            }
        }
        None => {
            report(
                diagnostics,
                Diagnostic::TemplateContentLoss {
                    tag: definition.tag.clone(),
                    discarded_nodes: captured.len(),
                },
            );
            MergeOutcome::Discarded {
                nodes: captured.len(),
            }
        }
    };
    Ok(Some(MergeRecord {
        node,
        outcome,
        captured,
    }))
}
