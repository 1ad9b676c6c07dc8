use thiserror::Error;

use crate::ports::PortError;

/// An expected surface node is absent. Fatal for the enclosing construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no unclaimed <{tag}> found under {parent}")]
pub struct BindingError {
    pub tag: String,
    pub parent: String,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Port(#[from] PortError),
    #[error("unknown component definition: {0}")]
    UnknownDefinition(String),
    #[error("component definition already registered: {0}")]
    DuplicateDefinition(String),
    #[error("surface node {node} is already claimed by another component")]
    AlreadyClaimed { node: String },
    #[error("{owner} declares no repeated child {child}")]
    UnknownChild { owner: String, child: String },
}

impl RuntimeError {
    pub fn is_binding(&self) -> bool {
        matches!(self, RuntimeError::Binding(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AnimationError {
    #[error("animation session was abandoned before completion")]
    Abandoned,
    #[error("animation session detached without a completion signal")]
    Detached,
}
