pub mod config;
pub mod custody;
pub mod document;
pub mod markup;
pub mod store;

pub use config::VaultAdapterConfig;
pub use custody::CustodyAdapter;
pub use document::Document;
pub use markup::{parse_fragment, MarkupError, MarkupNode};
pub use store::StateStore;
