//! Fixture environments
//!
//! An [`Environment`] wraps every test registered through it in its own
//! before/after layers, independently of the suite hooks around it. The whole
//! chain runs inside the test callback:
//!
//! before-all, before-each, body, after-each, after-all
//!
//! [`Environment::extend`] layers new hooks over an existing environment.
//! The parent's before hooks run first and its after hooks run last.

use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

use super::{Callback, Registry, TestId};
use crate::models::State;

/// Reusable before/after layers applied around individual tests
#[derive(Clone, Default)]
pub struct Environment {
    before_all: Vec<Callback>,
    before_each: Vec<Callback>,
    after_each: Vec<Callback>,
    after_all: Vec<Callback>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_all<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        self.before_all.push(Arc::new(hook));
        self
    }

    pub fn before_each<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        self.before_each.push(Arc::new(hook));
        self
    }

    pub fn after_each<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        self.after_each.push(Arc::new(hook));
        self
    }

    pub fn after_all<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        self.after_all.push(Arc::new(hook));
        self
    }

    /// New environment with `layer` inside this one
    ///
    /// `self` is left untouched, so one base environment can be extended in
    /// several directions.
    pub fn extend(&self, layer: Environment) -> Environment {
        let mut before_all = self.before_all.clone();
        before_all.extend(layer.before_all);

        let mut before_each = self.before_each.clone();
        before_each.extend(layer.before_each);

        let mut after_each = layer.after_each;
        after_each.extend(self.after_each.iter().cloned());

        let mut after_all = layer.after_all;
        after_all.extend(self.after_all.iter().cloned());

        Environment {
            before_all,
            before_each,
            after_each,
            after_all,
        }
    }

    /// Declare a test in the registry's current suite, wrapped in this environment
    ///
    /// A failing before hook fails the test without running the body or the
    /// after hooks. Once the body has run, the after hooks always run and the
    /// body's error is reported unless an after hook fails first.
    pub fn it<F>(&self, registry: &mut Registry, name: impl Into<String>, body: F) -> TestId
    where
        F: for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        let env = self.clone();
        let body: Callback = Arc::new(body);

        registry.it(name, move |state| {
            let env = env.clone();
            let body = body.clone();
            Box::pin(async move { env.wrap(state, &body).await })
        })
    }

    /// Alias of [`Environment::it`]
    pub fn test<F>(&self, registry: &mut Registry, name: impl Into<String>, body: F) -> TestId
    where
        F: for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        self.it(registry, name, body)
    }

    async fn wrap(&self, state: &mut State, body: &Callback) -> anyhow::Result<()> {
        for hook in self.before_all.iter().chain(&self.before_each) {
            hook(&mut *state).await?;
        }

        let outcome = body(&mut *state).await;

        for hook in self.after_each.iter().chain(&self.after_all) {
            hook(&mut *state).await?;
        }

        outcome
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("before_all", &self.before_all.len())
            .field("before_each", &self.before_each.len())
            .field("after_each", &self.after_each.len())
            .field("after_all", &self.after_all.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::callback;
    use anyhow::{anyhow, ensure};
    use std::sync::Mutex;
    use std::time::Duration;

    type Log = Arc<Mutex<Vec<String>>>;

    const NO_LIMIT: Duration = Duration::ZERO;

    fn record(
        log: &Log,
        label: impl Into<String>,
    ) -> impl for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static
    {
        let log = log.clone();
        let label = label.into();
        callback(move |_| {
            let log = log.clone();
            let label = label.clone();
            Box::pin(async move {
                log.lock().unwrap().push(label);
                Ok(())
            })
        })
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    fn layered(log: &Log, layer: &str) -> Environment {
        Environment::new()
            .before_all(record(log, format!("{layer}.beforeAll")))
            .before_each(record(log, format!("{layer}.beforeEach")))
            .after_each(record(log, format!("{layer}.afterEach")))
            .after_all(record(log, format!("{layer}.afterAll")))
    }

    #[tokio::test]
    async fn test_chain_wraps_every_test() {
        let log: Log = Arc::default();
        let mut registry = Registry::new();
        let env = layered(&log, "outer");
        let first = env.it(&mut registry, "first", record(&log, "body"));
        let second = env.test(&mut registry, "second", record(&log, "body"));

        assert!(registry.run_in_isolation(first, NO_LIMIT, NO_LIMIT).await.is_pass());
        assert!(registry.run_in_isolation(second, NO_LIMIT, NO_LIMIT).await.is_pass());

        let once = [
            "outer.beforeAll",
            "outer.beforeEach",
            "body",
            "outer.afterEach",
            "outer.afterAll",
        ];
        assert_eq!(entries(&log), [once, once].concat());
    }

    #[tokio::test]
    async fn test_extend_nests_layers() {
        let log: Log = Arc::default();
        let mut registry = Registry::new();
        let base = layered(&log, "outer");
        let extended = base.extend(layered(&log, "inner"));
        let test = extended.it(&mut registry, "t", record(&log, "body"));

        assert!(registry.run_in_isolation(test, NO_LIMIT, NO_LIMIT).await.is_pass());
        assert_eq!(
            entries(&log),
            vec![
                "outer.beforeAll",
                "inner.beforeAll",
                "outer.beforeEach",
                "inner.beforeEach",
                "body",
                "inner.afterEach",
                "outer.afterEach",
                "inner.afterAll",
                "outer.afterAll",
            ]
        );

        log.lock().unwrap().clear();
        let plain = base.it(&mut registry, "plain", record(&log, "body"));
        assert!(registry.run_in_isolation(plain, NO_LIMIT, NO_LIMIT).await.is_pass());
        assert_eq!(entries(&log).len(), 5);
    }

    #[tokio::test]
    async fn test_body_error_reraised_after_teardown() {
        let log: Log = Arc::default();
        let mut registry = Registry::new();
        let env = layered(&log, "outer");
        let test = env.it(&mut registry, "t", |_| {
            Box::pin(async { Err(anyhow!("assertion failed")) })
        });

        let result = registry.run_in_isolation(test, NO_LIMIT, NO_LIMIT).await;
        assert_eq!(result.message().as_deref(), Some("assertion failed"));
        assert_eq!(
            entries(&log),
            vec![
                "outer.beforeAll",
                "outer.beforeEach",
                "outer.afterEach",
                "outer.afterAll",
            ]
        );
    }

    #[tokio::test]
    async fn test_before_failure_skips_body_and_teardown() {
        let log: Log = Arc::default();
        let mut registry = Registry::new();
        let env = Environment::new()
            .before_each(|_| Box::pin(async { Err(anyhow!("no browser")) }))
            .after_each(record(&log, "afterEach"));
        let test = env.it(&mut registry, "t", record(&log, "body"));

        let result = registry.run_in_isolation(test, NO_LIMIT, NO_LIMIT).await;
        assert_eq!(result.message().as_deref(), Some("no browser"));
        assert!(entries(&log).is_empty());
    }

    #[tokio::test]
    async fn test_layers_share_state_with_body() {
        let mut registry = Registry::new();
        let base = Environment::new().before_all(|state| {
            Box::pin(async move {
                state.insert("base_url", "http://localhost".to_string());
                Ok(())
            })
        });
        let env = base.extend(Environment::new().before_each(|state| {
            Box::pin(async move {
                let base_url = state.get::<String>("base_url").cloned().unwrap_or_default();
                state.insert("page", format!("{base_url}/index.html"));
                Ok(())
            })
        }));

        registry.describe("pages", move |r| {
            Box::pin(async move {
                env.it(r, "opens", |state| {
                    Box::pin(async move {
                        ensure!(
                            state.get::<String>("page").map(String::as_str)
                                == Some("http://localhost/index.html")
                        );
                        Ok(())
                    })
                });
                Ok(())
            })
        });

        let tests = registry.resolve_root(NO_LIMIT).await.unwrap();
        let result = registry.run_in_isolation(tests[0], NO_LIMIT, NO_LIMIT).await;
        assert!(result.is_pass(), "{result:?}");
        assert_eq!(result.full_name, "pages opens");
    }
}
