//! Wallet shell: component definitions and the markup they bind over.

use alloy::primitives::Address;
use serde_json::Value;

use rusty_vault_adapters::markup::{escape_attribute, escape_text};
use rusty_vault_runtime::naming::{field_name_with, repeated_field_name_with};
use rusty_vault_runtime::{
    Account, ComponentDefinition, ComponentInstance, DefinitionRegistry, HostTree, Runtime,
    RuntimeError,
};

pub const APP: &str = "XVaultApp";
pub const ACCOUNT_LIST: &str = "XAccountList";
pub const ACCOUNT_ROW: &str = "XAccountRow";
pub const SEND_MODAL: &str = "XSendTransactionModal";

pub const ACCOUNTS_KEY: &str = "accounts";
pub const SESSION_KEY: &str = "session";

pub const INTRO_STYLE: &str = "intro";

pub const SHELL_MARKUP: &str = r#"
<x-vault-app>
  <h1>Vault</h1>
  <x-account-list></x-account-list>
  <x-send-transaction-modal>
    <label>Recipient <input name="to"></label>
    <label>Amount <input name="value"></label>
  </x-send-transaction-modal>
</x-vault-app>
"#;

const SEND_MODAL_TEMPLATE: &str =
    r#"<header>Send transaction</header><form data-content></form><footer><button>Sign</button></footer>"#;

pub fn definitions() -> Result<DefinitionRegistry, RuntimeError> {
    let mut registry = DefinitionRegistry::new();
    registry.register(ComponentDefinition::new("XPanel").no_children().styles(["panel"]))?;
    registry.register(
        ComponentDefinition::new(ACCOUNT_ROW)
            .no_children()
            .styles(["account-row"])
            .on_create(|row, _| {
                tracing::debug!(node = %row.node(), "account row bound");
            }),
    )?;
    registry.register(
        ComponentDefinition::new(ACCOUNT_LIST)
            .extends("XPanel")
            .repeated(ACCOUNT_ROW),
    )?;
    registry.register(
        ComponentDefinition::new(SEND_MODAL)
            .extends("XPanel")
            .template(SEND_MODAL_TEMPLATE)
            .styles(["modal", "hidden"]),
    )?;
    registry.register(
        ComponentDefinition::new(APP)
            .child(ACCOUNT_LIST)
            .child(SEND_MODAL)
            .styles(["vault"])
            .on_create(|app, args: &Value| {
                if let Some(title) = args.get("title").and_then(Value::as_str) {
                    tracing::info!(node = %app.node(), title, "vault shell created");
                }
            }),
    )?;
    Ok(registry)
}

fn account_row_markup(account: &Account) -> String {
    format!(
        r#"<x-account-row data-address="{}">{}</x-account-row>"#,
        escape_attribute(&account.address.to_checksum(None)),
        escape_text(&account.profile),
    )
}

/// Appends a row per account not yet shown and binds the new rows.
pub fn render_accounts<H: HostTree>(
    runtime: &Runtime<H>,
    app: &mut ComponentInstance,
    accounts: &[Account],
) -> Result<usize, RuntimeError> {
    let options = runtime.options();
    let list_field = field_name_with(ACCOUNT_LIST, &options.field_sigil);
    let rows_field = repeated_field_name_with(ACCOUNT_ROW, &options.field_sigil, &options.plural_suffix);
    let list = app
        .child_mut(&list_field)
        .ok_or_else(|| RuntimeError::UnknownChild {
            owner: APP.to_owned(),
            child: ACCOUNT_LIST.to_owned(),
        })?;

    let mut shown: Vec<Address> = Vec::new();
    for row in list.children(&rows_field) {
        let address: Option<Address> = runtime
            .host()
            .attribute(row.node(), "data-address")?
            .and_then(|raw| raw.parse().ok());
        shown.extend(address);
    }

    let markup: String = accounts
        .iter()
        .filter(|account| !shown.contains(&account.address))
        .map(account_row_markup)
        .collect();
    if markup.is_empty() {
        return Ok(0);
    }
    runtime.host().append_markup(list.node(), &markup)?;
    runtime.rebuild_section(list, ACCOUNT_ROW)
}
