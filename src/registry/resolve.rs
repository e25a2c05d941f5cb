//! Suite resolution
//!
//! Runs pending suite bodies and flattens the tree into declaration-ordered
//! test lists, memoized per suite.

use futures::future::{BoxFuture, FutureExt};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

use super::{Child, Registry, SuiteId, TestId};
use crate::executor::{CallbackError, ScopedCall, Terminator};

/// Registration failure; fatal to the whole resolution call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("failed to register suite \"{suite}\": {source}")]
    Registration {
        suite: String,
        #[source]
        source: CallbackError,
    },
}

impl ResolveError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ResolveError::Registration {
                source: CallbackError::TimedOut(_),
                ..
            }
        )
    }
}

impl Registry {
    /// Ordered tests reachable under `suite`, depth-first in declaration order
    ///
    /// A suite body runs at most once, under `timeout` (zero means no limit),
    /// with the suite as the current declaration target. Repeat calls return
    /// the memoized list.
    pub fn resolve(
        &mut self,
        suite: SuiteId,
        timeout: Duration,
    ) -> BoxFuture<'_, Result<Vec<TestId>, ResolveError>> {
        async move {
            if let Some(tests) = &self.suites[suite.0].resolved {
                return Ok(tests.clone());
            }

            if let Some(body) = self.suites[suite.0].body.take() {
                debug!("Registering suite {:?}", self.suite_full_name(suite));

                let terminator = Terminator::new();
                let call = ScopedCall::new(timeout, &terminator);

                self.stack.push(suite);
                let registered = {
                    let registry = &mut *self;
                    call.run(move || body(registry)).await
                };
                self.stack.pop();

                if let Err(source) = registered {
                    let name = self.suite_full_name(suite);
                    error!("Suite {:?} failed to register: {}", name, source);
                    return Err(ResolveError::Registration {
                        suite: name,
                        source,
                    });
                }
            }

            let children = self.suites[suite.0].children.clone();
            let mut tests = Vec::new();

            for child in children {
                match child {
                    Child::Test(test) => tests.push(test),
                    Child::Suite(nested) => tests.extend(self.resolve(nested, timeout).await?),
                }
            }

            self.suites[suite.0].resolved = Some(tests.clone());
            Ok(tests)
        }
        .boxed()
    }

    /// Resolve the whole tree
    pub async fn resolve_root(&mut self, timeout: Duration) -> Result<Vec<TestId>, ResolveError> {
        let root = self.root();
        self.resolve(root, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::fixtures::noop;
    use anyhow::anyhow;
    use std::future::pending;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_preorder_declaration_order() {
        let mut registry = Registry::new();
        registry.it("a", noop);
        registry.describe("s1", |r| {
            Box::pin(async move {
                r.it("b", noop);
                r.describe("s2", |r| {
                    Box::pin(async move {
                        r.it("c", noop);
                        Ok(())
                    })
                });
                r.it("d", noop);
                Ok(())
            })
        });
        registry.it("e", noop);

        let tests = registry.resolve_root(Duration::ZERO).await.unwrap();
        let names: Vec<_> = tests.iter().map(|&t| registry.test(t).name()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_resolution_is_memoized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        let counter = calls.clone();
        registry.describe("once", move |r| {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                r.it("t", noop);
                Ok(())
            })
        });

        let first = registry.resolve_root(Duration::ZERO).await.unwrap();
        let second = registry.resolve_root(Duration::ZERO).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_nested_suite_resolved_first_is_reused() {
        let mut registry = Registry::new();
        let outer = registry.describe("outer", |r| {
            Box::pin(async move {
                r.it("x", noop);
                Ok(())
            })
        });

        let inner_first = registry.resolve(outer, Duration::ZERO).await.unwrap();
        let all = registry.resolve_root(Duration::ZERO).await.unwrap();
        assert_eq!(inner_first, all);
    }

    #[tokio::test]
    async fn test_async_body_registers_after_await() {
        let mut registry = Registry::new();
        registry.describe("async", |r| {
            Box::pin(async move {
                tokio::task::yield_now().await;
                r.it("late", noop);
                Ok(())
            })
        });

        let tests = registry.resolve_root(Duration::from_secs(1)).await.unwrap();
        assert_eq!(registry.test(tests[0]).name(), "late");
    }

    #[tokio::test]
    async fn test_body_error_is_fatal_and_restores_context() {
        let mut registry = Registry::new();
        registry.describe("broken", |r| {
            Box::pin(async move {
                r.it("declared before failing", noop);
                Err(anyhow!("bad fixture"))
            })
        });

        let err = registry.resolve_root(Duration::ZERO).await.unwrap_err();
        assert_eq!(
            err,
            ResolveError::Registration {
                suite: "broken".to_string(),
                source: CallbackError::Raised("bad fixture".to_string()),
            }
        );
        assert!(!err.is_timeout());
        assert_eq!(registry.current(), registry.root());
    }

    #[tokio::test]
    async fn test_body_timeout() {
        let mut registry = Registry::new();
        registry.describe("hangs", |_| Box::pin(pending::<anyhow::Result<()>>()));

        let err = registry
            .resolve_root(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "failed to register suite \"hangs\": timed out after 20ms"
        );
    }

    #[tokio::test]
    async fn test_body_panic_is_a_registration_error() {
        let mut registry = Registry::new();
        registry.describe("bad", |_| panic!("body panicked synchronously"));

        let err = registry.resolve_root(Duration::ZERO).await.unwrap_err();
        assert_eq!(
            err,
            ResolveError::Registration {
                suite: "bad".to_string(),
                source: CallbackError::Raised(
                    "panicked: body panicked synchronously".to_string()
                ),
            }
        );
        assert_eq!(registry.current(), registry.root());
    }
}
