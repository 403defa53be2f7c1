use std::fmt::{self, Debug};

use tokio::sync::{mpsc, oneshot, watch};

use crate::{Actor, ActorDeadError};

/// Object-safe adapter so that messages of different types can share one
/// queue.
pub trait BoxMessage<S>: Send + Debug + 'static {
    fn handle_box(self: Box<Self>, state: &mut S, handle: &Actor<S>);
}

/// A message that an actor with state `S` can process.
pub trait Message<S>: BoxMessage<S> {
    /// Handles the message with exclusive access to the actor's state.
    ///
    /// `handle` refers to the actor itself, so the message may schedule
    /// follow-up work by sending more messages.
    fn handle(self, state: &mut S, handle: &Actor<S>);
}

impl<S, M: Message<S>> BoxMessage<S> for M {
    #[inline]
    fn handle_box(self: Box<Self>, state: &mut S, handle: &Actor<S>) {
        (*self).handle(state, handle)
    }
}

impl<S, M: Message<S> + ?Sized> Message<S> for Box<M> {
    #[inline]
    fn handle(self, state: &mut S, handle: &Actor<S>) {
        self.handle_box(state, handle)
    }
}

pub type BoxedMessage<S> = Box<dyn Message<S>>;

/// A closure evaluated against the actor state, whose result is sent back
/// to the caller.
pub struct Ask<F, R> {
    pub f: F,
    pub reply_tx: oneshot::Sender<R>,
}

impl<F, R> Debug for Ask<F, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ask").finish_non_exhaustive()
    }
}

impl<S, F, R> Message<S> for Ask<F, R>
where
    S: 'static,
    F: FnOnce(&mut S, &Actor<S>) -> R + Send + 'static,
    R: Send + 'static,
{
    fn handle(self, state: &mut S, handle: &Actor<S>) {
        let reply = (self.f)(state, handle);
        if self.reply_tx.send(reply).is_err() {
            trace!("asker went away before the reply");
        }
    }
}

pub struct MailboxParts<S> {
    pub mailbox: Mailbox<S>,
    pub msg_rx: mpsc::UnboundedReceiver<BoxedMessage<S>>,
    pub kill_rx: watch::Receiver<bool>,
}

pub struct Mailbox<S> {
    msg_tx: mpsc::UnboundedSender<BoxedMessage<S>>,
    kill_tx: watch::Sender<bool>,
}

impl<S: Send + 'static> Mailbox<S> {
    pub fn new() -> MailboxParts<S> {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = watch::channel(false);
        MailboxParts {
            mailbox: Mailbox { msg_tx, kill_tx },
            msg_rx,
            kill_rx,
        }
    }

    #[inline]
    pub fn post(&self, msg: BoxedMessage<S>) -> Result<(), ActorDeadError> {
        self.msg_tx.send(msg).map_err(|_| ActorDeadError)
    }

    #[inline]
    pub fn kill(&self) {
        self.kill_tx.send_replace(true);
    }
}
