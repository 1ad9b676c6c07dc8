use alloy::primitives::Bytes;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{
    Account, AppMeta, ListenerId, LoginOutcome, LogoutOutcome, NodeId, Notification,
    NotificationHandler, Profile, StoreListener, StoreSubscriptionId, TransactionRequest,
};

#[derive(Debug, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("policy error: {0}")]
    Policy(String),
}

/// The presentation tree the runtime binds components onto.
///
/// Node order is always document order. `dispatch` must invoke handlers without
/// holding any internal lock so that handlers can mutate the tree or unsubscribe.
pub trait HostTree {
    fn root(&self) -> Result<NodeId, PortError>;
    fn tag_name(&self, node: NodeId) -> Result<String, PortError>;
    fn parent(&self, node: NodeId) -> Result<Option<NodeId>, PortError>;
    fn descendants_by_tag(&self, scope: NodeId, tag: &str) -> Result<Vec<NodeId>, PortError>;
    fn first_with_attribute(&self, scope: NodeId, name: &str)
        -> Result<Option<NodeId>, PortError>;

    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>, PortError>;
    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), PortError>;
    fn remove_attribute(&self, node: NodeId, name: &str) -> Result<(), PortError>;

    fn styles(&self, node: NodeId) -> Result<Vec<String>, PortError>;
    fn add_style(&self, node: NodeId, style: &str) -> Result<(), PortError>;
    fn remove_style(&self, node: NodeId, style: &str) -> Result<(), PortError>;

    /// Detaches and returns the node's children in order.
    fn take_children(&self, node: NodeId) -> Result<Vec<NodeId>, PortError>;
    fn append_children(&self, node: NodeId, children: &[NodeId]) -> Result<(), PortError>;
    fn append_markup(&self, node: NodeId, markup: &str) -> Result<(), PortError>;
    fn inner_markup(&self, node: NodeId) -> Result<String, PortError>;
    /// Whether the node carries any element or non-blank text.
    fn has_content(&self, node: NodeId) -> Result<bool, PortError>;
    fn create_detached(&self, tag: &str) -> Result<NodeId, PortError>;
    /// Frees detached subtrees. Their ids must not be used afterwards.
    fn discard(&self, nodes: &[NodeId]) -> Result<(), PortError>;

    fn subscribe(
        &self,
        node: NodeId,
        name: &str,
        handler: NotificationHandler,
    ) -> Result<ListenerId, PortError>;
    fn unsubscribe(&self, listener: ListenerId) -> Result<(), PortError>;
    fn dispatch(&self, notification: Notification) -> Result<(), PortError>;
}

pub trait KeyCustodyPort {
    fn list(&self) -> Result<Vec<Account>, PortError>;
    fn signup(&self, profile: &Profile, app: &AppMeta) -> Result<Account, PortError>;
    fn login(&self, profile: &Profile, app: &AppMeta) -> Result<LoginOutcome, PortError>;
    fn logout(&self, profile: &Profile, app: &AppMeta) -> Result<LogoutOutcome, PortError>;
    fn sign_transaction(
        &self,
        account: &Account,
        tx: &TransactionRequest,
    ) -> Result<Bytes, PortError>;
}

pub trait StateStorePort {
    fn get(&self, key: &str) -> Result<Option<Value>, PortError>;
    fn dispatch(&self, key: &str, value: Value) -> Result<(), PortError>;
    fn subscribe(&self, key: &str, listener: StoreListener)
        -> Result<StoreSubscriptionId, PortError>;
    fn unsubscribe(&self, id: StoreSubscriptionId) -> Result<(), PortError>;
}
