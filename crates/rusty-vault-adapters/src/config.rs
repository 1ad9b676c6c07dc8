use rusty_vault_runtime::{AppMeta, RuntimeOptions};

#[derive(Debug, Clone)]
pub struct VaultAdapterConfig {
    pub runtime: RuntimeOptions,
    /// JSON-RPC endpoint of the key-custody service. `None` selects the
    /// deterministic in-memory custody.
    pub custody_url: Option<String>,
    pub custody_timeout_ms: u64,
    pub launch_timeout_ms: u64,
    pub app_name: String,
    pub app_origin: String,
    /// Profile to sign up (on first run) and log in at startup.
    pub profile: Option<String>,
}

impl Default for VaultAdapterConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeOptions::default(),
            custody_url: None,
            custody_timeout_ms: 15_000,
            launch_timeout_ms: 10_000,
            app_name: "rusty-vault".to_owned(),
            app_origin: "app://rusty-vault".to_owned(),
            profile: None,
        }
    }
}

impl VaultAdapterConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        let text = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        if let Some(v) = text("VAULT_CLAIMED_ATTRIBUTE") {
            cfg.runtime.claimed_attribute = v;
        }
        if let Some(v) = text("VAULT_SLOT_ATTRIBUTE") {
            cfg.runtime.slot_attribute = v;
        }
        if let Some(v) = text("VAULT_COMPLETION_EVENT") {
            cfg.runtime.completion_event = v;
        }
        cfg.custody_url = text("VAULT_CUSTODY_URL");
        if let Some(ms) = text("VAULT_CUSTODY_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            cfg.custody_timeout_ms = ms;
        }
        if let Some(ms) = text("VAULT_LAUNCH_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            cfg.launch_timeout_ms = ms;
        }
        if let Some(v) = text("VAULT_APP_NAME") {
            cfg.app_name = v;
        }
        if let Some(v) = text("VAULT_APP_ORIGIN") {
            cfg.app_origin = v;
        }
        cfg.profile = text("VAULT_PROFILE");
        cfg
    }

    pub fn app_meta(&self) -> AppMeta {
        AppMeta {
            name: self.app_name.clone(),
            origin: self.app_origin.clone(),
        }
    }
}
