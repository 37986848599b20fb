// SPDX-License-Identifier: Apache-2.0
//! At-most-one-active-set bookkeeping for query result streams.

use crate::stream::{QueryToken, StreamHandle};

/// Callback toggling the caller's loading indicator.
pub type LoadingCallback = Box<dyn FnMut(bool)>;

/// Owns the active stream set for the current query.
///
/// Registering a new set destroys the previous one first, so at most one
/// set is ever live. Each registration bumps the generation; callbacks
/// carrying a token from an older generation are stale and ignored by the
/// query methods here.
#[derive(Default)]
pub struct QueryStreamRegistry {
    streams: Vec<Box<dyn StreamHandle>>,
    on_loading: Option<LoadingCallback>,
    generation: u64,
    live: bool,
    ended: usize,
}

impl QueryStreamRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new stream set, tearing down any previous one. The
    /// returned token guards every callback for this set.
    pub fn register(
        &mut self,
        streams: Vec<Box<dyn StreamHandle>>,
        on_loading: LoadingCallback,
    ) -> QueryToken {
        self.destroy_streams();
        self.streams = streams;
        self.on_loading = Some(on_loading);
        self.generation += 1;
        self.live = true;
        self.ended = 0;
        tracing::debug!(
            generation = self.generation,
            streams = self.streams.len(),
            "stream set registered"
        );
        QueryToken::new(self.generation)
    }

    /// Tear down the active set and report not-loading. No-op when idle.
    /// Returns `true` when a live set was actually cancelled.
    pub fn cancel(&mut self) -> bool {
        if !self.live {
            return false;
        }
        self.destroy_streams();
        self.live = false;
        if let Some(on_loading) = self.on_loading.as_mut() {
            on_loading(false);
        }
        self.on_loading = None;
        tracing::debug!(generation = self.generation, "stream set cancelled");
        true
    }

    /// True while `token` names the live generation.
    #[must_use]
    pub fn is_live(&self, token: QueryToken) -> bool {
        self.live && token.value() == self.generation
    }

    /// Streams in the active set; zero when idle.
    #[must_use]
    pub fn active_len(&self) -> usize {
        if self.live {
            self.streams.len()
        } else {
            0
        }
    }

    /// Record that one stream of the set behind `token` finished. When the
    /// last one ends the set completes naturally: the loading callback
    /// fires `false` and the registry goes idle. Returns `true` exactly
    /// when this call completed the set.
    pub fn on_stream_end(&mut self, token: QueryToken) -> bool {
        if !self.is_live(token) {
            tracing::debug!(token = token.value(), "ignoring stale stream end");
            return false;
        }
        self.ended += 1;
        if self.ended < self.streams.len() {
            return false;
        }
        self.destroy_streams();
        self.live = false;
        if let Some(on_loading) = self.on_loading.as_mut() {
            on_loading(false);
        }
        self.on_loading = None;
        tracing::debug!(generation = self.generation, "stream set completed");
        true
    }

    /// Per-handle failures are logged and do not stop siblings.
    fn destroy_streams(&mut self) {
        for (i, stream) in self.streams.iter_mut().enumerate() {
            if let Err(err) = stream.destroy() {
                tracing::warn!(stream = i, error = %err, "stream teardown failed");
            }
        }
        self.streams.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamError;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct RecordingStream {
        destroyed: Rc<RefCell<usize>>,
        fail_on_destroy: bool,
    }

    impl StreamHandle for RecordingStream {
        fn destroy(&mut self) -> Result<(), StreamError> {
            *self.destroyed.borrow_mut() += 1;
            if self.fail_on_destroy {
                return Err(StreamError::AlreadyDestroyed);
            }
            Ok(())
        }
    }

    fn stream(destroyed: &Rc<RefCell<usize>>) -> Box<dyn StreamHandle> {
        Box::new(RecordingStream {
            destroyed: Rc::clone(destroyed),
            fail_on_destroy: false,
        })
    }

    #[test]
    fn registering_replaces_and_destroys_the_previous_set() {
        let first_destroyed = Rc::new(RefCell::new(0));
        let second_destroyed = Rc::new(RefCell::new(0));
        let mut registry = QueryStreamRegistry::new();

        let t1 = registry.register(vec![stream(&first_destroyed)], Box::new(|_| {}));
        let t2 = registry.register(vec![stream(&second_destroyed)], Box::new(|_| {}));

        assert_eq!(*first_destroyed.borrow(), 1);
        assert_eq!(*second_destroyed.borrow(), 0);
        assert!(!registry.is_live(t1));
        assert!(registry.is_live(t2));
        assert_eq!(registry.active_len(), 1);
    }

    #[test]
    fn a_failing_handle_does_not_stop_sibling_teardown() {
        let destroyed = Rc::new(RefCell::new(0));
        let mut registry = QueryStreamRegistry::new();
        registry.register(
            vec![
                Box::new(RecordingStream {
                    destroyed: Rc::clone(&destroyed),
                    fail_on_destroy: true,
                }),
                stream(&destroyed),
            ],
            Box::new(|_| {}),
        );
        assert!(registry.cancel());
        assert_eq!(*destroyed.borrow(), 2);
    }

    #[test]
    fn cancel_reports_not_loading_and_is_idempotent() {
        let loading = Rc::new(RefCell::new(Vec::new()));
        let destroyed = Rc::new(RefCell::new(0));
        let mut registry = QueryStreamRegistry::new();

        let sink = Rc::clone(&loading);
        let token = registry.register(
            vec![stream(&destroyed)],
            Box::new(move |v| sink.borrow_mut().push(v)),
        );

        assert!(registry.cancel());
        assert!(!registry.cancel());
        assert_eq!(*loading.borrow(), vec![false]);
        assert_eq!(*destroyed.borrow(), 1);
        assert!(!registry.is_live(token));
        assert_eq!(registry.active_len(), 0);
    }

    #[test]
    fn natural_completion_fires_when_the_last_stream_ends() {
        let loading = Rc::new(RefCell::new(Vec::new()));
        let destroyed = Rc::new(RefCell::new(0));
        let mut registry = QueryStreamRegistry::new();

        let sink = Rc::clone(&loading);
        let token = registry.register(
            vec![stream(&destroyed), stream(&destroyed)],
            Box::new(move |v| sink.borrow_mut().push(v)),
        );

        assert!(!registry.on_stream_end(token));
        assert!(loading.borrow().is_empty());
        assert!(registry.on_stream_end(token));
        assert_eq!(*loading.borrow(), vec![false]);
        assert!(!registry.is_live(token));

        // Completion already tore everything down; cancel has nothing left.
        assert!(!registry.cancel());
    }

    #[test]
    fn stale_tokens_are_ignored() {
        let destroyed = Rc::new(RefCell::new(0));
        let mut registry = QueryStreamRegistry::new();

        let old = registry.register(vec![stream(&destroyed)], Box::new(|_| {}));
        let live = registry.register(vec![stream(&destroyed)], Box::new(|_| {}));

        assert!(!registry.on_stream_end(old));
        assert!(registry.is_live(live));
        assert_eq!(registry.active_len(), 1);
    }
}
