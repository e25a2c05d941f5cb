//! Suite registry
//!
//! Arena of suites and tests addressed by stable indices. Declarations attach
//! to the suite on top of the registration stack; a nested suite's body is
//! stored and only runs when the suite is resolved, with that suite pushed as
//! the current one.
//!
//! ```ignore
//! let mut registry = Registry::new();
//! registry.describe("page", |r| {
//!     Box::pin(async move {
//!         r.before_each(|state| Box::pin(async move {
//!             state.insert("url", "about:blank");
//!             Ok(())
//!         }));
//!         r.it("loads", |state| Box::pin(async move {
//!             anyhow::ensure!(state.contains_key("url"));
//!             Ok(())
//!         }));
//!         Ok(())
//!     })
//! });
//! ```

mod environment;
mod focus;
mod resolve;

pub use environment::Environment;
pub use resolve::ResolveError;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::models::{HookKind, State};

/// Hook or test callback; receives the worker's shared state
pub type Callback =
    Arc<dyn for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync>;

/// Deferred suite body; receives the registry to declare children on
pub type SuiteBody =
    Box<dyn for<'a> FnOnce(&'a mut Registry) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync>;

/// Stable index of a suite
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuiteId(usize);

/// Stable index of a test
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(usize);

impl SuiteId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl TestId {
    pub fn index(self) -> usize {
        self.0
    }

    pub(crate) fn from_raw(index: usize) -> Self {
        Self(index)
    }
}

/// Entry in a suite's ordered child list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Child {
    Suite(SuiteId),
    Test(TestId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mark {
    Plain,
    Focused,
    Skipped,
}

#[derive(Default)]
struct Hooks {
    before_all: Vec<Callback>,
    after_all: Vec<Callback>,
    before_each: Vec<Callback>,
    after_each: Vec<Callback>,
}

impl Hooks {
    fn list(&self, kind: HookKind) -> &[Callback] {
        match kind {
            HookKind::BeforeAll => &self.before_all,
            HookKind::AfterAll => &self.after_all,
            HookKind::BeforeEach => &self.before_each,
            HookKind::AfterEach => &self.after_each,
        }
    }

    fn list_mut(&mut self, kind: HookKind) -> &mut Vec<Callback> {
        match kind {
            HookKind::BeforeAll => &mut self.before_all,
            HookKind::AfterAll => &mut self.after_all,
            HookKind::BeforeEach => &mut self.before_each,
            HookKind::AfterEach => &mut self.after_each,
        }
    }
}

/// A named or anonymous group of tests, hooks and nested suites
pub struct Suite {
    name: String,
    parent: Option<SuiteId>,
    children: Vec<Child>,
    hooks: Hooks,
    body: Option<SuiteBody>,
    focused: bool,
    skipped: bool,
    resolved: Option<Vec<TestId>>,
}

impl Suite {
    fn new(name: String, parent: Option<SuiteId>, body: Option<SuiteBody>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            hooks: Hooks::default(),
            body,
            focused: false,
            skipped: false,
            resolved: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<SuiteId> {
        self.parent
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    pub fn hooks(&self, kind: HookKind) -> &[Callback] {
        self.hooks.list(kind)
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn set_skipped(&mut self, skipped: bool) {
        self.skipped = skipped;
    }

    /// Whether the deferred body has already run
    pub fn is_registered(&self) -> bool {
        self.body.is_none()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}

impl fmt::Debug for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("focused", &self.focused)
            .field("skipped", &self.skipped)
            .field("registered", &self.is_registered())
            .finish_non_exhaustive()
    }
}

/// A single test callback owned by exactly one suite
pub struct Test {
    name: String,
    suite: SuiteId,
    callback: Callback,
    focused: bool,
    skipped: bool,
}

impl Test {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn suite(&self) -> SuiteId {
        self.suite
    }

    pub fn callback(&self) -> &Callback {
        &self.callback
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn set_skipped(&mut self, skipped: bool) {
        self.skipped = skipped;
    }
}

impl fmt::Debug for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test")
            .field("name", &self.name)
            .field("suite", &self.suite)
            .field("focused", &self.focused)
            .field("skipped", &self.skipped)
            .finish_non_exhaustive()
    }
}

/// Suite/test arena plus the registration stack
pub struct Registry {
    suites: Vec<Suite>,
    tests: Vec<Test>,
    stack: Vec<SuiteId>,
}

impl Registry {
    /// Create a registry holding only the anonymous root suite
    pub fn new() -> Self {
        let root = SuiteId(0);
        Self {
            suites: vec![Suite::new(String::new(), None, None)],
            tests: Vec::new(),
            stack: vec![root],
        }
    }

    pub fn root(&self) -> SuiteId {
        SuiteId(0)
    }

    /// Suite that declarations currently attach to
    pub fn current(&self) -> SuiteId {
        self.stack.last().copied().unwrap_or(SuiteId(0))
    }

    pub fn suite(&self, id: SuiteId) -> &Suite {
        &self.suites[id.0]
    }

    pub fn suite_mut(&mut self, id: SuiteId) -> &mut Suite {
        &mut self.suites[id.0]
    }

    pub fn test(&self, id: TestId) -> &Test {
        &self.tests[id.0]
    }

    pub fn test_mut(&mut self, id: TestId) -> &mut Test {
        &mut self.tests[id.0]
    }

    pub fn suite_count(&self) -> usize {
        self.suites.len()
    }

    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// Declare a named suite; its body runs at resolution time
    pub fn describe<F>(&mut self, name: impl Into<String>, body: F) -> SuiteId
    where
        F: for<'a> FnOnce(&'a mut Registry) -> BoxFuture<'a, anyhow::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        self.create_suite(name.into(), Box::new(body), Mark::Plain)
    }

    /// Declare a suite without a name; it is invisible in full names and titles
    pub fn describe_anonymous<F>(&mut self, body: F) -> SuiteId
    where
        F: for<'a> FnOnce(&'a mut Registry) -> BoxFuture<'a, anyhow::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        self.create_suite(String::new(), Box::new(body), Mark::Plain)
    }

    /// Declare a focused suite
    pub fn fdescribe<F>(&mut self, name: impl Into<String>, body: F) -> SuiteId
    where
        F: for<'a> FnOnce(&'a mut Registry) -> BoxFuture<'a, anyhow::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        self.create_suite(name.into(), Box::new(body), Mark::Focused)
    }

    /// Declare a skipped suite
    pub fn xdescribe<F>(&mut self, name: impl Into<String>, body: F) -> SuiteId
    where
        F: for<'a> FnOnce(&'a mut Registry) -> BoxFuture<'a, anyhow::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        self.create_suite(name.into(), Box::new(body), Mark::Skipped)
    }

    fn create_suite(&mut self, name: String, body: SuiteBody, mark: Mark) -> SuiteId {
        let parent = self.current();
        let id = SuiteId(self.suites.len());
        let mut suite = Suite::new(name, Some(parent), Some(body));
        suite.focused = mark == Mark::Focused;
        suite.skipped = mark == Mark::Skipped;

        debug!("Declared suite {:?} under {:?} ({:?})", suite.name, parent, mark);
        self.suites.push(suite);
        self.suites[parent.0].children.push(Child::Suite(id));
        id
    }

    /// Declare a test in the current suite
    pub fn it<F>(&mut self, name: impl Into<String>, callback: F) -> TestId
    where
        F: for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        self.create_test(name.into(), Arc::new(callback), Mark::Plain)
    }

    /// Declare a focused test
    pub fn fit<F>(&mut self, name: impl Into<String>, callback: F) -> TestId
    where
        F: for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        self.create_test(name.into(), Arc::new(callback), Mark::Focused)
    }

    /// Declare a skipped test
    pub fn xit<F>(&mut self, name: impl Into<String>, callback: F) -> TestId
    where
        F: for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        self.create_test(name.into(), Arc::new(callback), Mark::Skipped)
    }

    fn create_test(&mut self, name: String, callback: Callback, mark: Mark) -> TestId {
        let suite = self.current();
        let id = TestId(self.tests.len());

        self.tests.push(Test {
            name,
            suite,
            callback,
            focused: mark == Mark::Focused,
            skipped: mark == Mark::Skipped,
        });
        self.suites[suite.0].children.push(Child::Test(id));
        id
    }

    pub fn before_all<F>(&mut self, callback: F)
    where
        F: for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        self.add_hook(HookKind::BeforeAll, Arc::new(callback));
    }

    pub fn after_all<F>(&mut self, callback: F)
    where
        F: for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        self.add_hook(HookKind::AfterAll, Arc::new(callback));
    }

    pub fn before_each<F>(&mut self, callback: F)
    where
        F: for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        self.add_hook(HookKind::BeforeEach, Arc::new(callback));
    }

    pub fn after_each<F>(&mut self, callback: F)
    where
        F: for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        self.add_hook(HookKind::AfterEach, Arc::new(callback));
    }

    /// Append a hook to the current suite
    pub fn add_hook(&mut self, kind: HookKind, callback: Callback) {
        let suite = self.current();
        self.suites[suite.0].hooks.list_mut(kind).push(callback);
    }

    /// Suite chain from the root down to `suite`, inclusive
    pub fn ancestors(&self, suite: SuiteId) -> Vec<SuiteId> {
        let mut chain = Vec::new();
        let mut cursor = Some(suite);

        while let Some(id) = cursor {
            chain.push(id);
            cursor = self.suites[id.0].parent;
        }

        chain.reverse();
        chain
    }

    /// Space-joined names from the root down; empty names vanish
    pub fn suite_full_name(&self, suite: SuiteId) -> String {
        let node = &self.suites[suite.0];
        match node.parent {
            Some(parent) => format!("{} {}", self.suite_full_name(parent), node.name)
                .trim()
                .to_string(),
            None => node.name.clone(),
        }
    }

    /// Non-empty suite names from the root down
    pub fn suite_ancestor_titles(&self, suite: SuiteId) -> Vec<String> {
        self.ancestors(suite)
            .into_iter()
            .map(|id| &self.suites[id.0].name)
            .filter(|name| !name.is_empty())
            .cloned()
            .collect()
    }

    pub fn test_full_name(&self, test: TestId) -> String {
        let node = &self.tests[test.0];
        format!("{} {}", self.suite_full_name(node.suite), node.name)
            .trim()
            .to_string()
    }

    /// Enclosing suite titles followed by the test's own name
    pub fn test_ancestor_titles(&self, test: TestId) -> Vec<String> {
        let node = &self.tests[test.0];
        let mut titles = self.suite_ancestor_titles(node.suite);
        titles.push(node.name.clone());
        titles
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("suites", &self.suites)
            .field("tests", &self.tests)
            .field("stack", &self.stack)
            .finish()
    }
}

/// Pin a closure to the hook/test callback signature
///
/// Useful when a callback is built inside a helper function instead of being
/// passed straight to a registration method.
pub fn callback<F>(f: F) -> F
where
    F: for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
{
    f
}
