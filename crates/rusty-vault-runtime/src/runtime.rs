use std::sync::Arc;

use serde_json::Value;

use crate::animation::{self, Animation, AnimationRequest};
use crate::binder::{Owner, SurfaceBinder};
use crate::builder::TreeBuilder;
use crate::definition::DefinitionRegistry;
use crate::diagnostics::DiagnosticSink;
use crate::domain::{NodeId, Notification};
use crate::error::RuntimeError;
use crate::events::{self, Subscription};
use crate::instance::{ChildSlot, ComponentInstance};
use crate::options::RuntimeOptions;
use crate::ports::{HostTree, PortError};

/// Entry point binding registered component definitions onto a host tree.
pub struct Runtime<H: HostTree> {
    host: H,
    registry: Arc<DefinitionRegistry>,
    options: RuntimeOptions,
    diagnostics: Option<DiagnosticSink>,
}

impl<H: HostTree> Runtime<H> {
    pub fn new(host: H, registry: DefinitionRegistry) -> Self {
        Self {
            host,
            registry: Arc::new(registry),
            options: RuntimeOptions::default(),
            diagnostics: None,
        }
    }

    pub fn with_options(mut self, options: RuntimeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_diagnostics(mut self, sink: DiagnosticSink) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    fn binder(&self) -> SurfaceBinder<'_, H> {
        SurfaceBinder {
            host: &self.host,
            options: &self.options,
            diagnostics: self.diagnostics.as_ref(),
        }
    }

    fn builder(&self) -> TreeBuilder<'_, H> {
        TreeBuilder::new(
            &self.host,
            &self.registry,
            &self.options,
            self.diagnostics.as_ref(),
        )
    }

    /// Runs `op`, reverting what it claimed and merged if it fails.
    fn scoped<T>(
        &self,
        op: impl FnOnce(&TreeBuilder<'_, H>) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        let builder = self.builder();
        let result = op(&builder);
        match &result {
            Ok(_) => builder.commit(),
            Err(e) => {
                let reverted = builder.rollback();
                tracing::debug!(error = %e, reverted, "construction failed; steps reverted");
            }
        }
        result
    }

    /// Binds, merges the template, builds children and runs the creation hook.
    ///
    /// A binding failure anywhere in the subtree aborts the whole construction:
    /// claimed nodes become available again and merged templates are undone.
    pub fn construct(
        &self,
        definition: &str,
        owner: Owner<'_>,
        args: &Value,
    ) -> Result<ComponentInstance, RuntimeError> {
        let definition = self.registry.get(definition)?;
        let node = self.binder().resolve(&definition, owner)?;
        self.scoped(|builder| builder.bind_and_build(&definition, node, args))
    }

    /// Top-level construction against the presentation root.
    pub fn mount(&self, definition: &str, args: &Value) -> Result<ComponentInstance, RuntimeError> {
        let instance = self.construct(definition, Owner::Root, args)?;
        let mut bound = 0usize;
        instance.walk(&mut |_| bound += 1);
        tracing::info!(definition, node = %instance.node(), instances = bound, "component tree mounted");
        Ok(instance)
    }

    pub fn adopt(
        &self,
        definition: &str,
        node: NodeId,
        args: &Value,
    ) -> Result<ComponentInstance, RuntimeError> {
        self.construct(definition, Owner::Node(node), args)
    }

    /// Creates an unparented node for the definition's tag and builds over it.
    pub fn create_detached(
        &self,
        definition: &str,
        args: &Value,
    ) -> Result<ComponentInstance, RuntimeError> {
        let resolved = self.registry.get(definition)?;
        let node = self.host.create_detached(&resolved.tag)?;
        self.construct(definition, Owner::Node(node), args)
    }

    /// Re-runs a repeated child declaration, appending instances for nodes that
    /// became available since the last build.
    ///
    /// On error the owner is left untouched and the nodes claimed by this attempt
    /// are released, so a later rebuild picks them up once the markup is fixed.
    pub fn rebuild_section(
        &self,
        owner: &mut ComponentInstance,
        definition: &str,
    ) -> Result<usize, RuntimeError> {
        let declaration = owner
            .definition()
            .repeated_child(definition)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownChild {
                owner: owner.type_name().to_owned(),
                child: definition.to_owned(),
            })?;

        let mut staging = ComponentInstance::new(owner.shared_definition(), owner.node());
        let added = self.scoped(|builder| builder.build_declaration(&mut staging, &declaration))?;
        for (field, slot) in staging.into_fields() {
            if let ChildSlot::Many(items) = slot {
                owner.extend_many(field, items);
            }
        }
        tracing::debug!(owner = %owner.type_name(), definition, added, "section rebuilt");
        Ok(added)
    }

    pub fn emit(
        &self,
        instance: &ComponentInstance,
        name: &str,
        detail: Value,
        bubbles: bool,
    ) -> Result<(), PortError> {
        events::emit(&self.host, instance.node(), name, detail, bubbles)
    }
}

impl<H> Runtime<H>
where
    H: HostTree + Clone + Send + Sync + 'static,
{
    pub fn listen_once<F>(
        &self,
        target: NodeId,
        name: &str,
        callback: F,
    ) -> Result<Subscription<H>, PortError>
    where
        F: FnOnce(&Notification) + Send + 'static,
    {
        events::listen_once(&self.host, target, name, callback)
    }

    pub fn animate(&self, request: AnimationRequest<'_>) -> Result<Animation<H>, PortError> {
        animation::animate(&self.host, &self.options.completion_event, request)
    }
}
