//! Test worker
//!
//! Runs a linear sequence of tests against one shared [`State`], entering and
//! leaving suite scopes so that each suite's before-all/after-all hooks run
//! once per activation.

use std::time::Duration;
use tracing::{debug, warn};

use super::scoped::{ScopedCall, Terminator};
use crate::models::{HookKind, Phase, RunResult, State};
use crate::registry::{Callback, Registry, ResolveError, SuiteId, TestId};
use crate::utils::Timer;

/// Where a worker currently is in a test's lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerPhase {
    Idle,
    TransitioningScopes,
    BeforeEach,
    TestBody,
    AfterEach,
    Done,
}

/// Sequential executor for tests sharing one state object
///
/// Not meant for concurrent use: one worker drives one ordered sequence.
pub struct Worker<'r> {
    registry: &'r Registry,
    active: Vec<SuiteId>,
    state: State,
    phase: WorkerPhase,
    terminator: Terminator,
}

impl<'r> Worker<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self::with_state(registry, State::new())
    }

    /// Start from a pre-populated state
    pub fn with_state(registry: &'r Registry, state: State) -> Self {
        Self {
            registry,
            active: Vec::new(),
            state,
            phase: WorkerPhase::Idle,
            terminator: Terminator::new(),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    pub fn into_state(self) -> State {
        self.state
    }

    pub fn phase(&self) -> WorkerPhase {
        self.phase
    }

    /// Suites whose before-all hooks have run and after-all hooks have not, outermost first
    pub fn active_suites(&self) -> &[SuiteId] {
        &self.active
    }

    /// Handle that terminates whichever hook or test body is in flight
    pub fn terminator(&self) -> Terminator {
        self.terminator.clone()
    }

    /// Run one test; `timeout` bounds the body, `hook_timeout` every hook
    pub async fn run(
        &mut self,
        test: TestId,
        timeout: Duration,
        hook_timeout: Duration,
    ) -> RunResult {
        let registry = self.registry;
        let full_name = registry.test_full_name(test);
        let mut run = RunResult::new(
            test,
            registry.test(test).name(),
            full_name.clone(),
            registry.test_ancestor_titles(test),
        );

        if !registry.should_run(test) {
            debug!("Skipping {:?}", full_name);
            return run.skipped();
        }

        let timer = Timer::start(full_name);

        if self.enter_scopes(&mut run, test, hook_timeout).await {
            self.run_lifecycle(&mut run, test, timeout, hook_timeout).await;
        }

        run.duration_ms = timer.elapsed_ms();
        self.phase = WorkerPhase::Idle;
        run
    }

    /// Run every pending after-all hook, innermost suite first
    ///
    /// There is no run result to blame, so failures are only logged.
    pub async fn shutdown(&mut self, hook_timeout: Duration) {
        let registry = self.registry;
        self.phase = WorkerPhase::TransitioningScopes;

        while let Some(suite) = self.active.pop() {
            debug!("Leaving suite {:?} at shutdown", registry.suite_full_name(suite));
            for hook in registry.suite(suite).hooks(HookKind::AfterAll) {
                self.run_hook(None, hook, HookKind::AfterAll, hook_timeout).await;
            }
        }

        self.phase = WorkerPhase::Done;
    }

    /// Align the active stack with the test's suite chain
    ///
    /// Returns false when a scope hook failed and the test must not run.
    async fn enter_scopes(
        &mut self,
        run: &mut RunResult,
        test: TestId,
        hook_timeout: Duration,
    ) -> bool {
        let registry = self.registry;
        self.phase = WorkerPhase::TransitioningScopes;

        let chain = registry.ancestors(registry.test(test).suite());
        let common = self
            .active
            .iter()
            .zip(&chain)
            .take_while(|(active, wanted)| active == wanted)
            .count();

        while self.active.len() > common {
            let Some(suite) = self.active.pop() else {
                break;
            };
            debug!("Leaving suite {:?}", registry.suite_full_name(suite));
            self.run_scope_hooks(run, suite, HookKind::AfterAll, hook_timeout).await;
        }

        if !run.is_pass() {
            return false;
        }

        while self.active.len() < chain.len() {
            let suite = chain[self.active.len()];
            self.active.push(suite);
            debug!("Entering suite {:?}", registry.suite_full_name(suite));

            if !self
                .run_scope_hooks(run, suite, HookKind::BeforeAll, hook_timeout)
                .await
            {
                return false;
            }
        }

        true
    }

    /// Before-each chain, test body, after-each chain
    async fn run_lifecycle(
        &mut self,
        run: &mut RunResult,
        test: TestId,
        timeout: Duration,
        hook_timeout: Duration,
    ) {
        let registry = self.registry;
        let scopes = self.active.clone();

        self.phase = WorkerPhase::BeforeEach;
        for &suite in &scopes {
            for hook in registry.suite(suite).hooks(HookKind::BeforeEach) {
                self.run_hook(Some(&mut *run), hook, HookKind::BeforeEach, hook_timeout)
                    .await;
            }
        }

        if run.is_pass() {
            self.phase = WorkerPhase::TestBody;
            let body = registry.test(test).callback();
            let state = &mut self.state;
            let call = ScopedCall::new(timeout, &self.terminator);
            let outcome = call.run(move || body(state)).await;
            self.terminator.disarm();

            if let Err(err) = outcome {
                run.record_failure(err.into_failure(Phase::Test));
            }
        }

        self.phase = WorkerPhase::AfterEach;
        for &suite in scopes.iter().rev() {
            for hook in registry.suite(suite).hooks(HookKind::AfterEach) {
                self.run_hook(Some(&mut *run), hook, HookKind::AfterEach, hook_timeout)
                    .await;
            }
        }
    }

    /// Run one suite's before-all or after-all list, stopping at the first failure
    async fn run_scope_hooks(
        &mut self,
        run: &mut RunResult,
        suite: SuiteId,
        kind: HookKind,
        hook_timeout: Duration,
    ) -> bool {
        let registry = self.registry;
        for hook in registry.suite(suite).hooks(kind) {
            if !self.run_hook(Some(&mut *run), hook, kind, hook_timeout).await {
                return false;
            }
        }
        true
    }

    async fn run_hook(
        &mut self,
        run: Option<&mut RunResult>,
        hook: &Callback,
        kind: HookKind,
        hook_timeout: Duration,
    ) -> bool {
        let state = &mut self.state;
        let call = ScopedCall::new(hook_timeout, &self.terminator);
        let outcome = call.run(move || hook(state)).await;
        self.terminator.disarm();

        let Err(err) = outcome else {
            return true;
        };

        match run {
            Some(run) => {
                debug!("{} hook failed for {:?}: {}", kind, run.full_name, err);
                run.record_failure(err.into_failure(Phase::Hook(kind)));
            }
            None => warn!("{} hook failed during shutdown: {}", kind, err),
        }
        false
    }
}

impl Registry {
    /// Run a single test on a fresh worker and shut it down
    pub async fn run_in_isolation(
        &self,
        test: TestId,
        timeout: Duration,
        hook_timeout: Duration,
    ) -> RunResult {
        let mut worker = Worker::new(self);
        let result = worker.run(test, timeout, hook_timeout).await;
        worker.shutdown(hook_timeout).await;
        result
    }

    /// Resolve `suite` and run all of its tests on one worker
    ///
    /// The suite counts as focused for the duration, so focus elsewhere in the
    /// tree does not exclude its tests; the previous flag is restored afterwards.
    pub async fn run_serially(
        &mut self,
        suite: SuiteId,
        timeout: Duration,
        hook_timeout: Duration,
    ) -> Result<Vec<RunResult>, ResolveError> {
        let tests = self.resolve(suite, hook_timeout).await?;
        let was_focused = self.suite(suite).is_focused();
        self.suite_mut(suite).set_focused(true);

        let mut results = Vec::with_capacity(tests.len());
        {
            let mut worker = Worker::new(self);
            for test in tests {
                results.push(worker.run(test, timeout, hook_timeout).await);
            }
            worker.shutdown(hook_timeout).await;
        }

        self.suite_mut(suite).set_focused(was_focused);
        Ok(results)
    }
}
