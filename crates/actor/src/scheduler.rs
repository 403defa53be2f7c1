use std::sync::Weak;

use tokio::select;
use tokio::sync::{mpsc, watch};

use crate::mailbox::{BoxedMessage, Mailbox};
use crate::{Actor, Message};

pub async fn run_actor<S: Send + 'static>(
    mailbox: Weak<Mailbox<S>>,
    mut state: S,
    mut msg_rx: mpsc::UnboundedReceiver<BoxedMessage<S>>,
    mut kill_rx: watch::Receiver<bool>,
) {
    debug!("started");
    while let Some(msg) = next_message(&mut msg_rx, &mut kill_rx).await {
        trace!("received message: {msg:?}");

        let Some(mailbox) = mailbox.upgrade() else {
            warn!("every handle has been dropped, discarding the message");
            break;
        };
        let handle = Actor::from_mailbox(mailbox);
        trace_span!("proc msg").in_scope(|| {
            msg.handle(&mut state, &handle);
        });
    }
    debug!("stopped");
}

async fn next_message<S>(
    msg_rx: &mut mpsc::UnboundedReceiver<BoxedMessage<S>>,
    kill_rx: &mut watch::Receiver<bool>,
) -> Option<BoxedMessage<S>> {
    if *kill_rx.borrow() {
        return None;
    }
    select! {
        biased;

        _ = kill_rx.changed() => None,
        msg = msg_rx.recv() => msg,
    }
}
