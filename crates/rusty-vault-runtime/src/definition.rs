use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::RuntimeError;
use crate::instance::ComponentInstance;
use crate::naming::type_to_tag_identifier;

pub type CreateHook = Arc<dyn Fn(&mut ComponentInstance, &Value) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildDeclaration {
    Single(String),
    /// One instance per unclaimed matching node found at build time.
    Repeated(String),
}

impl ChildDeclaration {
    pub fn definition(&self) -> &str {
        match self {
            ChildDeclaration::Single(name) | ChildDeclaration::Repeated(name) => name,
        }
    }

    pub fn is_repeated(&self) -> bool {
        matches!(self, ChildDeclaration::Repeated(_))
    }
}

/// Static description of a component, assembled with a builder.
#[derive(Clone)]
pub struct ComponentDefinition {
    type_name: String,
    extends: Option<String>,
    children: Option<Vec<ChildDeclaration>>,
    template: Option<String>,
    styles: Vec<String>,
    on_create: Option<CreateHook>,
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("type_name", &self.type_name)
            .field("extends", &self.extends)
            .field("children", &self.children)
            .field("template", &self.template)
            .field("styles", &self.styles)
            .field("on_create", &self.on_create.is_some())
            .finish()
    }
}

impl ComponentDefinition {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            extends: None,
            children: None,
            template: None,
            styles: Vec::new(),
            on_create: None,
        }
    }

    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.extends = Some(base.into());
        self
    }

    pub fn child(mut self, definition: impl Into<String>) -> Self {
        self.children
            .get_or_insert_with(Vec::new)
            .push(ChildDeclaration::Single(definition.into()));
        self
    }

    pub fn repeated(mut self, definition: impl Into<String>) -> Self {
        self.children
            .get_or_insert_with(Vec::new)
            .push(ChildDeclaration::Repeated(definition.into()));
        self
    }

    /// Declares an empty child list, hiding any children inherited from the base.
    pub fn no_children(mut self) -> Self {
        self.children = Some(Vec::new());
        self
    }

    pub fn template(mut self, markup: impl Into<String>) -> Self {
        self.template = Some(markup.into());
        self
    }

    pub fn styles<I, S>(mut self, styles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.styles.extend(styles.into_iter().map(Into::into));
        self
    }

    pub fn on_create<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ComponentInstance, &Value) + Send + Sync + 'static,
    {
        self.on_create = Some(Arc::new(hook));
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// A definition with its inheritance chain flattened at registration time.
pub struct ResolvedDefinition {
    pub type_name: String,
    pub tag: String,
    /// Base-first, ending with this definition.
    pub chain: Vec<String>,
    pub children: Vec<ChildDeclaration>,
    pub template: Option<String>,
    /// Base-first, duplicates removed.
    pub styles: Vec<String>,
    on_create: Option<CreateHook>,
}

impl fmt::Debug for ResolvedDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedDefinition")
            .field("type_name", &self.type_name)
            .field("tag", &self.tag)
            .field("chain", &self.chain)
            .field("children", &self.children)
            .field("styles", &self.styles)
            .finish()
    }
}

impl ResolvedDefinition {
    pub fn on_create(&self) -> Option<&CreateHook> {
        self.on_create.as_ref()
    }

    pub fn repeated_child(&self, definition: &str) -> Option<&ChildDeclaration> {
        self.children
            .iter()
            .find(|decl| decl.is_repeated() && decl.definition() == definition)
    }
}

#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    definitions: HashMap<String, Arc<ResolvedDefinition>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition. Its base, if any, must already be registered.
    pub fn register(
        &mut self,
        definition: ComponentDefinition,
    ) -> Result<Arc<ResolvedDefinition>, RuntimeError> {
        if self.definitions.contains_key(&definition.type_name) {
            return Err(RuntimeError::DuplicateDefinition(definition.type_name));
        }
        let base = match &definition.extends {
            Some(base) => Some(self.get(base)?),
            None => None,
        };

        let mut chain = base.as_ref().map(|b| b.chain.clone()).unwrap_or_default();
        chain.push(definition.type_name.clone());

        let mut styles = base.as_ref().map(|b| b.styles.clone()).unwrap_or_default();
        for style in definition.styles {
            if !styles.contains(&style) {
                styles.push(style);
            }
        }

        let children = match (definition.children, &base) {
            (Some(own), _) => own,
            (None, Some(b)) => b.children.clone(),
            (None, None) => Vec::new(),
        };
        let template = definition
            .template
            .or_else(|| base.as_ref().and_then(|b| b.template.clone()));
        let on_create = definition
            .on_create
            .or_else(|| base.as_ref().and_then(|b| b.on_create.clone()));

        let resolved = Arc::new(ResolvedDefinition {
            tag: type_to_tag_identifier(&definition.type_name),
            type_name: definition.type_name.clone(),
            chain,
            children,
            template,
            styles,
            on_create,
        });
        tracing::debug!(
            definition = %resolved.type_name,
            tag = %resolved.tag,
            chain = ?resolved.chain,
            "registered component definition"
        );
        self.definitions
            .insert(definition.type_name, Arc::clone(&resolved));
        Ok(resolved)
    }

    pub fn get(&self, type_name: &str) -> Result<Arc<ResolvedDefinition>, RuntimeError> {
        self.definitions
            .get(type_name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownDefinition(type_name.to_owned()))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.definitions.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
