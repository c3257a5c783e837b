// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub(crate) trait Cubit {
    type State;

    fn close(&mut self);

    fn is_closed(&self) -> bool;

    fn state(&self) -> Self::State;

    fn subscribe(&self) -> watch::Receiver<Self::State>;
}

/// State holder shared by all cubits
///
/// The state is published through a watch channel. The sender is shared, so
/// that background tasks of a cubit can publish as well. Background tasks
/// should stop when the cancellation token fires, which happens on close or
/// drop.
pub(crate) struct CubitCore<S> {
    state_tx: Arc<watch::Sender<S>>,
    cancel: CancellationToken,
}

impl<S> Drop for CubitCore<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<S: Clone> Cubit for CubitCore<S> {
    type State = S;

    fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn close(&mut self) {
        self.cancel.cancel();
    }

    fn state(&self) -> S {
        self.state_tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<S> {
        self.state_tx.subscribe()
    }
}

impl<S> CubitCore<S> {
    pub(crate) fn with_initial_state(state: S) -> Self {
        let (state_tx, _) = watch::channel(state);
        Self {
            state_tx: Arc::new(state_tx),
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn state_tx(&self) -> &Arc<watch::Sender<S>> {
        &self.state_tx
    }

    pub(crate) fn borrow_state(&self) -> watch::Ref<'_, S> {
        self.state_tx.borrow()
    }

    pub(crate) fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_and_close() {
        let mut core = CubitCore::with_initial_state(1);
        let mut rx = core.subscribe();

        core.state_tx().send_modify(|state| *state += 1);
        assert_eq!(core.state(), 2);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 2);

        let cancel = core.cancellation_token().clone();
        assert!(!core.is_closed());
        core.close();
        assert!(core.is_closed());
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn drop_cancels_background_tasks() {
        let core = CubitCore::with_initial_state(());
        let cancel = core.cancellation_token().clone();
        drop(core);
        assert!(cancel.is_cancelled());
    }
}
