use std::collections::VecDeque;

use crate::domain::NodeId;
use crate::ports::{HostTree, PortError};

/// Ordered snapshot of unclaimed candidate nodes for one tag under one scope.
///
/// Construction consumes from the front. A node claimed after the snapshot was
/// taken (by a sibling's subtree, say) is skipped when it reaches the front.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    queue: VecDeque<NodeId>,
}

impl CandidatePool {
    pub fn snapshot<H: HostTree>(
        host: &H,
        scope: NodeId,
        tag: &str,
        claimed_attribute: &str,
    ) -> Result<Self, PortError> {
        let mut queue = VecDeque::new();
        for node in host.descendants_by_tag(scope, tag)? {
            if host.attribute(node, claimed_attribute)?.is_none() {
                queue.push_back(node);
            }
        }
        tracing::debug!(scope = %scope, tag, candidates = queue.len(), "candidate snapshot");
        Ok(Self { queue })
    }

    pub fn next_unclaimed<H: HostTree>(
        &mut self,
        host: &H,
        claimed_attribute: &str,
    ) -> Result<Option<NodeId>, PortError> {
        while let Some(node) = self.queue.pop_front() {
            if host.attribute(node, claimed_attribute)?.is_none() {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
