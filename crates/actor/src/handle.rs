use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::Instrument;

use crate::mailbox::{Ask, Mailbox, MailboxParts};
use crate::scheduler::run_actor;
use crate::{ActorDeadError, Message};

/// Handle to a running actor.
///
/// Handles are cheap to clone. The actor keeps running until it is killed
/// or every handle has been dropped.
pub struct Actor<S> {
    mailbox: Arc<Mailbox<S>>,
}

impl<S: Send + 'static> Actor<S> {
    /// Spawns a new actor on the current tokio runtime.
    ///
    /// `label` only shows up in tracing spans.
    pub fn spawn(state: S, label: Option<&str>) -> Self {
        let MailboxParts {
            mailbox,
            msg_rx,
            kill_rx,
        } = Mailbox::new();
        let mailbox = Arc::new(mailbox);
        tokio::spawn(
            run_actor(Arc::downgrade(&mailbox), state, msg_rx, kill_rx)
                .instrument(trace_span!("actor", label = label)),
        );
        Self { mailbox }
    }

    #[inline]
    pub(crate) fn from_mailbox(mailbox: Arc<Mailbox<S>>) -> Self {
        Self { mailbox }
    }

    /// Enqueues a message without waiting for it to be handled.
    #[inline]
    pub fn send<M: Message<S>>(&self, msg: M) -> Result<(), ActorDeadError> {
        self.mailbox.post(Box::new(msg))
    }

    /// Runs `f` against the actor state and waits for its result.
    ///
    /// The closure is queued like any other message, so it observes every
    /// message sent before it.
    pub async fn ask<F, R>(&self, f: F) -> Result<R, ActorDeadError>
    where
        F: FnOnce(&mut S, &Actor<S>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Ask { f, reply_tx })?;
        reply_rx.await.map_err(|_| ActorDeadError)
    }

    /// Asks the actor to stop.
    ///
    /// Messages already queued are discarded and pending `ask` calls
    /// resolve to [`ActorDeadError`].
    #[inline]
    pub fn try_kill(&self) {
        self.mailbox.kill();
    }
}

impl<S> Clone for Actor<S> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}
