pub mod allocation;
pub mod animation;
mod binder;
mod builder;
pub mod definition;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod events;
pub mod instance;
pub mod naming;
pub mod options;
pub mod ports;
pub mod runtime;
pub mod template;

pub use animation::{Animation, AnimationPhase, AnimationRequest};
pub use binder::Owner;
pub use definition::{ChildDeclaration, ComponentDefinition, DefinitionRegistry, ResolvedDefinition};
pub use diagnostics::{Diagnostic, DiagnosticSink};
pub use domain::{
    Account, AppMeta, ListenerId, LoginOutcome, LogoutOutcome, NodeId, Notification,
    NotificationHandler, Profile, StoreListener, StoreSubscriptionId, TransactionRequest,
};
pub use error::{AnimationError, BindingError, RuntimeError};
pub use events::{emit, listen_once, listen_once_where, Subscription};
pub use instance::{ChildSlot, ComponentInstance};
pub use naming::{type_to_field_name, type_to_tag_identifier};
pub use options::RuntimeOptions;
pub use ports::{HostTree, KeyCustodyPort, PortError, StateStorePort};
pub use runtime::Runtime;
pub use template::MergeOutcome;
