//! Async boundary between the shell and the blocking key-custody port.
//! No call reaches the port before the custody service has signalled readiness.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use rusty_vault_runtime::{
    Account, AppMeta, KeyCustodyPort, LoginOutcome, LogoutOutcome, PortError, Profile,
};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("custody service not ready after {0:?}")]
    LaunchTimeout(Duration),
    #[error("custody launch abandoned before readiness")]
    LaunchAbandoned,
    #[error("custody task failed: {0}")]
    Join(String),
    #[error(transparent)]
    Port(#[from] PortError),
}

/// Held by whoever launches the custody service.
#[derive(Debug)]
pub struct LaunchHandle(watch::Sender<bool>);

impl LaunchHandle {
    pub fn mark_ready(&self) {
        self.0.send_replace(true);
        tracing::info!("custody service ready");
    }
}

pub struct CustodyBridge<C> {
    port: Arc<C>,
    ready: watch::Receiver<bool>,
    launch_timeout: Duration,
}

impl<C> Clone for CustodyBridge<C> {
    fn clone(&self) -> Self {
        Self {
            port: Arc::clone(&self.port),
            ready: self.ready.clone(),
            launch_timeout: self.launch_timeout,
        }
    }
}

impl<C> CustodyBridge<C>
where
    C: KeyCustodyPort + Send + Sync + 'static,
{
    pub fn new(port: C, launch_timeout: Duration) -> (Self, LaunchHandle) {
        let (sender, ready) = watch::channel(false);
        let bridge = Self {
            port: Arc::new(port),
            ready,
            launch_timeout,
        };
        (bridge, LaunchHandle(sender))
    }

    async fn wait_ready(&self) -> Result<(), BridgeError> {
        let mut ready = self.ready.clone();
        let waited = tokio::time::timeout(self.launch_timeout, async move {
            ready.wait_for(|launched| *launched).await.map(|_| ())
        })
        .await;
        match waited {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(BridgeError::LaunchAbandoned),
            Err(_) => Err(BridgeError::LaunchTimeout(self.launch_timeout)),
        }
    }

    async fn call<T, F>(&self, op: &'static str, f: F) -> Result<T, BridgeError>
    where
        T: Send + 'static,
        F: FnOnce(&C) -> Result<T, PortError> + Send + 'static,
    {
        self.wait_ready().await?;
        let port = Arc::clone(&self.port);
        tracing::debug!(op, "custody call");
        let out = tokio::task::spawn_blocking(move || f(&port))
            .await
            .map_err(|e| BridgeError::Join(e.to_string()))?;
        out.map_err(|e| {
            tracing::warn!(op, error = %e, "custody call failed");
            BridgeError::from(e)
        })
    }

    pub async fn list(&self) -> Result<Vec<Account>, BridgeError> {
        self.call("list", |port| port.list()).await
    }

    pub async fn signup(&self, profile: Profile, app: AppMeta) -> Result<Account, BridgeError> {
        self.call("signup", move |port| port.signup(&profile, &app)).await
    }

    pub async fn login(&self, profile: Profile, app: AppMeta) -> Result<LoginOutcome, BridgeError> {
        self.call("login", move |port| port.login(&profile, &app)).await
    }

    pub async fn logout(
        &self,
        profile: Profile,
        app: AppMeta,
    ) -> Result<LogoutOutcome, BridgeError> {
        self.call("logout", move |port| port.logout(&profile, &app)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusty_vault_adapters::CustodyAdapter;

    fn profile() -> Profile {
        Profile {
            name: "alice".to_owned(),
            passphrase_hint: None,
        }
    }

    fn app() -> AppMeta {
        AppMeta {
            name: "vault".to_owned(),
            origin: "app://vault".to_owned(),
        }
    }

    #[tokio::test]
    async fn calls_wait_for_launch() {
        let (bridge, launch) =
            CustodyBridge::new(CustodyAdapter::deterministic(), Duration::from_secs(5));
        let pending = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.signup(profile(), app()).await }
        });
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        launch.mark_ready();
        let account = pending.await.expect("join").expect("signup");
        let login = bridge.login(profile(), app()).await.expect("login");
        assert_eq!(login.addresses, vec![account.address]);
        assert!(bridge.logout(profile(), app()).await.expect("logout").success);
        assert_eq!(bridge.list().await.expect("list"), vec![account]);
    }

    #[tokio::test]
    async fn launch_timeout_is_reported() {
        let (bridge, _launch) =
            CustodyBridge::new(CustodyAdapter::deterministic(), Duration::from_millis(20));
        let err = bridge.list().await.expect_err("never launched");
        assert!(matches!(err, BridgeError::LaunchTimeout(_)));
    }

    #[tokio::test]
    async fn dropped_launch_handle_abandons_calls() {
        let (bridge, launch) =
            CustodyBridge::new(CustodyAdapter::deterministic(), Duration::from_secs(5));
        drop(launch);
        let err = bridge.list().await.expect_err("abandoned");
        assert!(matches!(err, BridgeError::LaunchAbandoned));
    }

    #[tokio::test]
    async fn port_errors_pass_through() {
        let (bridge, launch) =
            CustodyBridge::new(CustodyAdapter::deterministic(), Duration::from_secs(5));
        launch.mark_ready();
        let err = bridge.login(profile(), app()).await.expect_err("unknown");
        assert!(matches!(err, BridgeError::Port(PortError::NotFound(_))));
    }
}
