//! One-shot result delivery from the worker courier to the controller.
//!
//! A channel is bound to one worker-process lifetime and carries at most one
//! value. Writing twice is a protocol violation that fails loudly; a sender
//! that goes away without writing surfaces as a distinct failure on the
//! reading side, never as a fabricated result.

use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors from the one-shot result channel
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// `send` was called after a result had already been delivered
    #[error("result already delivered; a channel carries at most one result")]
    AlreadyCompleted,

    /// The sending side went away without delivering anything
    #[error("channel closed before a result was delivered")]
    SenderDropped,

    /// The reading side went away before the result could be delivered
    #[error("channel receiver went away")]
    ReceiverDropped,
}

/// Create a result channel bound to one worker-process lifetime
pub fn result_channel<T>() -> (ResultSender<T>, ResultReceiver<T>) {
    let (tx, rx) = oneshot::channel();
    (
        ResultSender {
            inner: Mutex::new(Some(tx)),
        },
        ResultReceiver { inner: rx },
    )
}

/// Writing half of the result channel; accepts exactly one value
#[derive(Debug)]
pub struct ResultSender<T> {
    inner: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> ResultSender<T> {
    /// Deliver the result.
    ///
    /// A second call returns `ChannelError::AlreadyCompleted` and leaves the
    /// first value untouched.
    pub fn send(&self, value: T) -> Result<(), ChannelError> {
        let sender = self.inner.lock().unwrap().take();
        match sender {
            Some(tx) => tx.send(value).map_err(|_| ChannelError::ReceiverDropped),
            None => Err(ChannelError::AlreadyCompleted),
        }
    }
}

/// Reading half of the result channel; resolves exactly once
#[derive(Debug)]
pub struct ResultReceiver<T> {
    inner: oneshot::Receiver<T>,
}

impl<T> ResultReceiver<T> {
    /// Wait until the result arrives or the sending side disappears.
    pub async fn receive(self) -> Result<T, ChannelError> {
        self.inner.await.map_err(|_| ChannelError::SenderDropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_single_value_is_delivered() {
        let (tx, rx) = result_channel();
        tx.send(7u32).unwrap();
        assert_eq!(rx.receive().await, Ok(7));
    }

    #[tokio::test]
    async fn test_second_send_is_a_violation_and_first_value_wins() {
        let (tx, rx) = result_channel();
        tx.send(1u32).unwrap();
        assert_eq!(tx.send(2), Err(ChannelError::AlreadyCompleted));
        assert_eq!(rx.receive().await, Ok(1));
    }

    #[tokio::test]
    async fn test_dropped_sender_never_fabricates_a_result() {
        let (tx, rx) = result_channel::<u32>();
        drop(tx);
        assert_eq!(rx.receive().await, Err(ChannelError::SenderDropped));
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_reported_to_sender() {
        let (tx, rx) = result_channel();
        drop(rx);
        assert_eq!(tx.send(1u32), Err(ChannelError::ReceiverDropped));
    }
}
