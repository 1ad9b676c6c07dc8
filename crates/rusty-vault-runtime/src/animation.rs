//! Declarative animations as awaitable units of work.
//!
//! `animate` applies a style tag to a node and returns an [`Animation`] future that
//! settles when the host reports the completion notification for that node.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::domain::NodeId;
use crate::error::AnimationError;
use crate::events::{listen_once_where, Subscription};
use crate::ports::{HostTree, PortError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPhase {
    Pending,
    Settled,
    Abandoned,
}

type StartedCallback<'a> = Box<dyn FnOnce() + 'a>;
type SettleCallback = Box<dyn FnOnce() + Send + 'static>;

pub struct AnimationRequest<'a> {
    style: String,
    target: NodeId,
    on_started: Option<StartedCallback<'a>>,
    on_before_settle: Option<SettleCallback>,
}

impl fmt::Debug for AnimationRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationRequest")
            .field("style", &self.style)
            .field("target", &self.target)
            .field("on_started", &self.on_started.is_some())
            .field("on_before_settle", &self.on_before_settle.is_some())
            .finish()
    }
}

impl<'a> AnimationRequest<'a> {
    pub fn new(style: impl Into<String>, target: NodeId) -> Self {
        Self {
            style: style.into(),
            target,
            on_started: None,
            on_before_settle: None,
        }
    }

    /// Runs synchronously right after the style tag is applied.
    pub fn on_started(mut self, callback: impl FnOnce() + 'a) -> Self {
        self.on_started = Some(Box::new(callback));
        self
    }

    /// Runs on completion, before the style tag is removed and the future settles.
    pub fn on_before_settle(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_before_settle = Some(Box::new(callback));
        self
    }
}

struct Session<H: HostTree> {
    host: H,
    target: NodeId,
    style: String,
    phase: Mutex<AnimationPhase>,
    subscription: Mutex<Option<Subscription<H>>>,
}

impl<H: HostTree> Session<H> {
    fn phase(&self) -> AnimationPhase {
        match self.phase.lock() {
            Ok(g) => *g,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// `Pending -> to`. Terminal phases never change again.
    fn advance(&self, to: AnimationPhase) -> bool {
        let mut g = match self.phase.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *g != AnimationPhase::Pending {
            return false;
        }
        *g = to;
        true
    }

    fn take_subscription(&self) -> Option<Subscription<H>> {
        match self.subscription.lock() {
            Ok(mut g) => g.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

/// Removes the triggering style tag when dropped, including during unwinding.
struct StyleTagGuard<'a, H: HostTree> {
    host: &'a H,
    target: NodeId,
    style: &'a str,
}

impl<H: HostTree> Drop for StyleTagGuard<'_, H> {
    fn drop(&mut self) {
        if let Err(e) = self.host.remove_style(self.target, self.style) {
            tracing::warn!(target_node = %self.target, style = self.style, error = %e, "style tag removal failed");
        }
    }
}

/// One in-flight animation. Resolves once, after the style tag was removed.
///
/// Dropping the future does not tear the session down: the style tag stays until
/// the completion notification arrives. Use [`Animation::abandon`] to detach early.
pub struct Animation<H: HostTree> {
    session: Arc<Session<H>>,
    receiver: oneshot::Receiver<()>,
}

impl<H: HostTree> fmt::Debug for Animation<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("target", &self.session.target)
            .field("style", &self.session.style)
            .field("phase", &self.session.phase())
            .finish()
    }
}

impl<H: HostTree> Animation<H> {
    pub fn phase(&self) -> AnimationPhase {
        self.session.phase()
    }

    pub fn is_settled(&self) -> bool {
        self.phase() == AnimationPhase::Settled
    }

    pub fn target(&self) -> NodeId {
        self.session.target
    }

    pub fn style(&self) -> &str {
        &self.session.style
    }

    /// Detaches the completion handler and removes the style tag without settling.
    pub fn abandon(&self) -> bool {
        if !self.session.advance(AnimationPhase::Abandoned) {
            return false;
        }
        drop(self.session.take_subscription());
        drop(StyleTagGuard {
            host: &self.session.host,
            target: self.session.target,
            style: &self.session.style,
        });
        tracing::debug!(target_node = %self.session.target, style = %self.session.style, "animation abandoned");
        true
    }
}

impl<H: HostTree> Future for Animation<H> {
    type Output = Result<(), AnimationError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(())) => Poll::Ready(Ok(())),
            Poll::Ready(Err(_)) => Poll::Ready(Err(match this.session.phase() {
                AnimationPhase::Abandoned => AnimationError::Abandoned,
                _ => AnimationError::Detached,
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}

pub fn animate<H>(
    host: &H,
    completion_event: &str,
    request: AnimationRequest<'_>,
) -> Result<Animation<H>, PortError>
where
    H: HostTree + Clone + Send + Sync + 'static,
{
    let AnimationRequest {
        style,
        target,
        on_started,
        on_before_settle,
    } = request;

    let session = Arc::new(Session {
        host: host.clone(),
        target,
        style,
        phase: Mutex::new(AnimationPhase::Pending),
        subscription: Mutex::new(None),
    });
    let (sender, receiver) = oneshot::channel();

    let settle_session = Arc::clone(&session);
    let subscription = listen_once_where(
        host,
        target,
        completion_event,
        move |notification| notification.target == target,
        move |_| {
            let session = settle_session;
            {
                let _guard = StyleTagGuard {
                    host: &session.host,
                    target: session.target,
                    style: &session.style,
                };
                if let Some(callback) = on_before_settle {
                    callback();
                }
            }
            drop(session.take_subscription());
            if session.advance(AnimationPhase::Settled) {
                let _ = sender.send(());
            }
        },
    )?;
    match session.subscription.lock() {
        Ok(mut g) => *g = Some(subscription),
        Err(poisoned) => *poisoned.into_inner() = Some(subscription),
    }

    if let Err(e) = host.add_style(target, &session.style) {
        drop(session.take_subscription());
        return Err(e);
    }
    tracing::debug!(target_node = %target, style = %session.style, "animation started");
    if let Some(callback) = on_started {
        callback();
    }

    Ok(Animation { session, receiver })
}
