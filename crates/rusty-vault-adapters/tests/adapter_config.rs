use std::collections::HashMap;

use rusty_vault_adapters::VaultAdapterConfig;

#[test]
fn lookup_overrides_defaults() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("VAULT_CUSTODY_URL", "http://127.0.0.1:8545"),
        ("VAULT_CUSTODY_TIMEOUT_MS", "2500"),
        ("VAULT_SLOT_ATTRIBUTE", "data-slot"),
        ("VAULT_LAUNCH_TIMEOUT_MS", "not-a-number"),
        ("VAULT_APP_NAME", "  "),
    ]);
    let cfg = VaultAdapterConfig::from_lookup(|key| env.get(key).map(|v| (*v).to_owned()));

    assert_eq!(cfg.custody_url.as_deref(), Some("http://127.0.0.1:8545"));
    assert_eq!(cfg.custody_timeout_ms, 2_500);
    assert_eq!(cfg.runtime.slot_attribute, "data-slot");
    assert_eq!(cfg.runtime.claimed_attribute, "data-claimed");
    assert_eq!(cfg.launch_timeout_ms, 10_000);
    assert_eq!(cfg.app_meta().name, "rusty-vault");
}

#[test]
fn empty_lookup_selects_in_memory_custody() {
    let cfg = VaultAdapterConfig::from_lookup(|_| None);
    assert!(cfg.custody_url.is_none());
    assert_eq!(cfg.runtime.completion_event, "animationend");
}
