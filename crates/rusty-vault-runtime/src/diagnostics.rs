use std::sync::Arc;

/// Observable, non-fatal events raised while building a component tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Pre-existing content was discarded because the template had no content slot.
    TemplateContentLoss { tag: String, discarded_nodes: usize },
    StylesApplied { tag: String, styles: Vec<String> },
    ChildrenBuilt { owner: String, field: String, count: usize },
}

pub type DiagnosticSink = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

pub(crate) fn report(sink: Option<&DiagnosticSink>, diagnostic: Diagnostic) {
    match &diagnostic {
        Diagnostic::TemplateContentLoss {
            tag,
            discarded_nodes,
        } => tracing::warn!(
            tag = %tag,
            discarded_nodes,
            "template has no content slot; existing content discarded"
        ),
        Diagnostic::StylesApplied { tag, styles } => {
            tracing::debug!(tag = %tag, ?styles, "styles applied")
        }
        Diagnostic::ChildrenBuilt {
            owner,
            field,
            count,
        } => tracing::debug!(owner = %owner, field = %field, count, "children built"),
    }
    if let Some(sink) = sink {
        sink(&diagnostic);
    }
}
