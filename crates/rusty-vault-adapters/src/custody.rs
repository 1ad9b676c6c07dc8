use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use alloy::primitives::{keccak256, Address, Bytes};
use serde::de::DeserializeOwned;
use serde_json::Value;

use rusty_vault_runtime::{
    Account, AppMeta, KeyCustodyPort, LoginOutcome, LogoutOutcome, PortError, Profile,
    TransactionRequest,
};

use crate::VaultAdapterConfig;

#[derive(Debug, Clone)]
pub struct CustodyAdapter {
    mode: CustodyMode,
    state: Arc<Mutex<CustodyState>>,
}

#[derive(Debug, Clone)]
enum CustodyMode {
    Disabled(String),
    Deterministic,
    Proxy(ProxyRuntime),
}

#[derive(Debug, Clone)]
struct ProxyRuntime {
    base_url: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Default)]
struct CustodyState {
    accounts: Vec<Account>,
    sessions: HashSet<String>,
    request_seq: u64,
}

impl Default for CustodyAdapter {
    fn default() -> Self {
        Self::with_config(&VaultAdapterConfig::default())
    }
}

impl CustodyAdapter {
    pub fn with_config(config: &VaultAdapterConfig) -> Self {
        let mode = match &config.custody_url {
            Some(base_url) => {
                let timeout = std::time::Duration::from_millis(config.custody_timeout_ms);
                match reqwest::blocking::Client::builder().timeout(timeout).build() {
                    Ok(client) => CustodyMode::Proxy(ProxyRuntime {
                        base_url: base_url.clone(),
                        client,
                    }),
                    Err(e) => CustodyMode::Disabled(format!(
                        "failed to initialize custody client for {base_url}: {e}"
                    )),
                }
            }
            None => CustodyMode::Deterministic,
        };
        Self {
            mode,
            state: Arc::new(Mutex::new(CustodyState::default())),
        }
    }

    pub fn deterministic() -> Self {
        Self {
            mode: CustodyMode::Deterministic,
            state: Arc::new(Mutex::new(CustodyState::default())),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.mode, CustodyMode::Proxy(_))
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let CustodyMode::Disabled(reason) = &self.mode {
            return Err(PortError::Policy(reason.clone()));
        }
        Ok(())
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut CustodyState) -> Result<T, PortError>,
    ) -> Result<T, PortError> {
        let mut g = self
            .state
            .lock()
            .map_err(|e| PortError::Transport(format!("custody lock poisoned: {e}")))?;
        f(&mut g)
    }

    fn deterministic_address(profile: &Profile, app: &AppMeta) -> Address {
        let mut seed = Vec::new();
        seed.extend_from_slice(profile.name.as_bytes());
        seed.push(0);
        seed.extend_from_slice(app.origin.as_bytes());
        Address::from_slice(&keccak256(seed)[12..])
    }

    fn deterministic_signature(account: &Account, payload: &[u8]) -> Bytes {
        let mut seed = Vec::new();
        seed.extend_from_slice(account.address.as_slice());
        seed.extend_from_slice(payload);
        let hash = keccak256(seed);
        let mut sig = Vec::with_capacity(65);
        sig.extend_from_slice(hash.as_slice());
        sig.extend_from_slice(hash.as_slice());
        sig.push(27);
        Bytes::from(sig)
    }

    fn proxy_call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, PortError> {
        let proxy = match &self.mode {
            CustodyMode::Proxy(proxy) => proxy,
            CustodyMode::Disabled(reason) => return Err(PortError::Policy(reason.clone())),
            CustodyMode::Deterministic => {
                return Err(PortError::NotImplemented("custody proxy runtime not enabled"))
            }
        };
        let id = self.with_state(|s| {
            s.request_seq = s.request_seq.saturating_add(1);
            Ok(s.request_seq)
        })?;

        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::debug!(method, id, "custody request");
        let response = proxy
            .client
            .post(&proxy.base_url)
            .json(&payload)
            .send()
            .map_err(|e| PortError::Transport(format!("custody request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|e| PortError::Transport(format!("custody json decode failed: {e}")))?;
        if !status.is_success() {
            return Err(PortError::Transport(format!(
                "custody status {}: {}",
                status, body
            )));
        }
        if let Some(err) = body.get("error") {
            return Err(PortError::Transport(format!(
                "custody returned error for {method}: {err}"
            )));
        }
        let result = body
            .get("result")
            .cloned()
            .ok_or_else(|| PortError::Transport("custody response missing result".to_owned()))?;
        serde_json::from_value(result)
            .map_err(|e| PortError::Validation(format!("custody {method} result invalid: {e}")))
    }
}

impl KeyCustodyPort for CustodyAdapter {
    fn list(&self) -> Result<Vec<Account>, PortError> {
        self.check_mode()?;
        if self.is_remote() {
            return self.proxy_call("list", serde_json::json!([]));
        }
        self.with_state(|s| Ok(s.accounts.clone()))
    }

    fn signup(&self, profile: &Profile, app: &AppMeta) -> Result<Account, PortError> {
        self.check_mode()?;
        if self.is_remote() {
            return self.proxy_call("signup", serde_json::json!([profile, app]));
        }
        let account = Account {
            profile: profile.name.clone(),
            address: Self::deterministic_address(profile, app),
        };
        self.with_state(|s| {
            if s.accounts.iter().any(|a| a.profile == profile.name) {
                return Err(PortError::Validation(format!(
                    "profile already registered: {}",
                    profile.name
                )));
            }
            s.accounts.push(account.clone());
            Ok(account)
        })
    }

    fn login(&self, profile: &Profile, app: &AppMeta) -> Result<LoginOutcome, PortError> {
        self.check_mode()?;
        if self.is_remote() {
            return self.proxy_call("login", serde_json::json!([profile, app]));
        }
        self.with_state(|s| {
            let addresses: Vec<Address> = s
                .accounts
                .iter()
                .filter(|a| a.profile == profile.name)
                .map(|a| a.address)
                .collect();
            if addresses.is_empty() {
                return Err(PortError::NotFound(format!("profile {}", profile.name)));
            }
            s.sessions.insert(profile.name.clone());
            Ok(LoginOutcome { addresses })
        })
    }

    fn logout(&self, profile: &Profile, app: &AppMeta) -> Result<LogoutOutcome, PortError> {
        self.check_mode()?;
        if self.is_remote() {
            return self.proxy_call("logout", serde_json::json!([profile, app]));
        }
        self.with_state(|s| {
            Ok(LogoutOutcome {
                success: s.sessions.remove(&profile.name),
            })
        })
    }

    fn sign_transaction(
        &self,
        account: &Account,
        tx: &TransactionRequest,
    ) -> Result<Bytes, PortError> {
        self.check_mode()?;
        if self.is_remote() {
            return self.proxy_call("signTransaction", serde_json::json!([account, tx]));
        }
        let logged_in = self.with_state(|s| Ok(s.sessions.contains(&account.profile)))?;
        if !logged_in {
            return Err(PortError::Policy(format!(
                "profile {} is not logged in",
                account.profile
            )));
        }
        let payload = serde_json::to_vec(tx)
            .map_err(|e| PortError::Validation(format!("transaction serialize failed: {e}")))?;
        Ok(Self::deterministic_signature(account, &payload))
    }
}
