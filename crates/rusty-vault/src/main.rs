//! Rusty-Vault: a wallet shell assembled from declarative components over a key-custody service

use std::sync::Arc;
use std::time::Duration;

use eyre::WrapErr;
use serde_json::json;

use rusty_vault_adapters::{CustodyAdapter, Document, StateStore, VaultAdapterConfig};
use rusty_vault_runtime::{
    AnimationRequest, HostTree, NodeId, Notification, Profile, Runtime, StateStorePort,
};

mod custody_bridge;
mod shell;

use custody_bridge::CustodyBridge;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Rusty-Vault");
    let config = VaultAdapterConfig::from_env();

    let document = Document::parse(shell::SHELL_MARKUP).wrap_err("shell markup")?;
    let runtime = Runtime::new(document.clone(), shell::definitions()?)
        .with_options(config.runtime.clone());
    let mut app = runtime
        .mount(shell::APP, &json!({ "title": config.app_name }))
        .wrap_err("mounting the wallet shell")?;

    let custody = CustodyAdapter::with_config(&config);
    tracing::info!(remote = custody.is_remote(), "custody adapter selected");
    let (bridge, launch) = CustodyBridge::new(
        custody,
        Duration::from_millis(config.launch_timeout_ms),
    );

    let store = StateStore::new();
    store.subscribe(
        shell::ACCOUNTS_KEY,
        Arc::new(|_: &str, accounts: &serde_json::Value| {
            let count = accounts.as_array().map_or(0, Vec::len);
            tracing::info!(count, "account list updated");
        }),
    )?;

    let shell_node = app.node();
    let intro = runtime.animate(
        AnimationRequest::new(shell::INTRO_STYLE, shell_node).on_started(|| {
            // Nothing renders the intro headless; report completion after one frame.
            finish_after_frame(
                document.clone(),
                shell_node,
                config.runtime.completion_event.clone(),
            );
        }),
    )?;

    launch.mark_ready();
    let mut accounts = bridge.list().await?;

    let session = match &config.profile {
        Some(name) => {
            let profile = Profile {
                name: name.clone(),
                passphrase_hint: None,
            };
            if !accounts.iter().any(|a| a.profile == profile.name) {
                let account = bridge.signup(profile.clone(), config.app_meta()).await?;
                tracing::info!(profile = %profile.name, address = %account.address, "profile signed up");
                accounts.push(account);
            }
            let outcome = bridge.login(profile.clone(), config.app_meta()).await?;
            store.dispatch(
                shell::SESSION_KEY,
                json!({ "profile": profile.name, "addresses": outcome.addresses }),
            )?;
            Some(profile)
        }
        None => None,
    };

    store.dispatch(shell::ACCOUNTS_KEY, serde_json::to_value(&accounts)?)?;
    let rows = shell::render_accounts(&runtime, &mut app, &accounts)?;
    tracing::info!(rows, "account rows rendered");

    match tokio::time::timeout(Duration::from_millis(config.launch_timeout_ms), intro).await {
        Ok(result) => result.wrap_err("intro animation")?,
        Err(_) => tracing::warn!("intro animation did not complete"),
    }

    if let Some(profile) = session {
        let outcome = bridge.logout(profile, config.app_meta()).await?;
        tracing::info!(success = outcome.success, "logged out");
    }

    let root = document.root()?;
    tracing::info!(markup = %document.inner_markup(root)?, "shell ready");
    Ok(())
}

fn finish_after_frame(document: Document, target: NodeId, event: String) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(16)).await;
        if let Err(e) = document.dispatch(Notification::new(event, target).bubbling(false)) {
            tracing::warn!(error = %e, "failed to report animation completion");
        }
    });
}
