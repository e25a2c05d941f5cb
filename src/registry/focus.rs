//! Focus and skip policy
//!
//! Runnability is decided when a test is about to run, not when it is
//! declared, so focus added anywhere in the tree afterwards still applies.

use super::{Child, Registry, SuiteId, TestId};

impl Registry {
    /// Whether `test` should run given the current focus and skip flags
    ///
    /// A test's own skip flag wins, then its own focus flag (so a focused
    /// test inside a skipped suite still runs), then any skipped ancestor.
    /// Otherwise the walk climbs toward the root until the first focused
    /// suite; if anything below that point is focused, this test is not.
    pub fn should_run(&self, test: TestId) -> bool {
        let node = &self.tests[test.0];

        if node.skipped {
            return false;
        }

        if node.focused {
            return true;
        }

        let mut cursor = Some(node.suite);
        while let Some(id) = cursor {
            let suite = &self.suites[id.0];
            if suite.skipped {
                return false;
            }
            cursor = suite.parent;
        }

        let mut boundary = node.suite;
        while let Some(parent) = self.suites[boundary.0].parent {
            if self.suites[boundary.0].focused {
                break;
            }
            boundary = parent;
        }

        !self.has_focused_descendant(boundary)
    }

    /// Whether any suite or test below `suite` is focused
    pub fn has_focused_descendant(&self, suite: SuiteId) -> bool {
        self.suites[suite.0].children.iter().any(|child| match *child {
            Child::Test(test) => self.tests[test.0].focused,
            Child::Suite(nested) => {
                self.suites[nested.0].focused || self.has_focused_descendant(nested)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::fixtures::noop;
    use std::time::Duration;

    async fn resolved(registry: &mut Registry) -> Vec<TestId> {
        registry.resolve_root(Duration::ZERO).await.unwrap()
    }

    fn runnable(registry: &Registry, tests: &[TestId]) -> Vec<String> {
        tests
            .iter()
            .filter(|&&t| registry.should_run(t))
            .map(|&t| registry.test_full_name(t))
            .collect()
    }

    #[tokio::test]
    async fn test_nothing_focused_runs_everything_not_skipped() {
        let mut registry = Registry::new();
        registry.it("a", noop);
        registry.xit("b", noop);
        registry.describe("s", |r| {
            Box::pin(async move {
                r.it("c", noop);
                Ok(())
            })
        });

        let tests = resolved(&mut registry).await;
        assert_eq!(runnable(&registry, &tests), vec!["a", "s c"]);
    }

    #[tokio::test]
    async fn test_single_focused_test_excludes_others() {
        let mut registry = Registry::new();
        registry.it("a", noop);
        registry.describe("s", |r| {
            Box::pin(async move {
                r.it("b", noop);
                r.fit("c", noop);
                Ok(())
            })
        });
        registry.describe("t", |r| {
            Box::pin(async move {
                r.it("d", noop);
                Ok(())
            })
        });

        let tests = resolved(&mut registry).await;
        assert_eq!(runnable(&registry, &tests), vec!["s c"]);
    }

    #[tokio::test]
    async fn test_focused_suite_runs_its_tests() {
        let mut registry = Registry::new();
        registry.it("a", noop);
        registry.fdescribe("f", |r| {
            Box::pin(async move {
                r.it("b", noop);
                r.describe("inner", |r| {
                    Box::pin(async move {
                        r.it("c", noop);
                        Ok(())
                    })
                });
                Ok(())
            })
        });

        let tests = resolved(&mut registry).await;
        assert_eq!(runnable(&registry, &tests), vec!["f b", "f inner c"]);
    }

    #[tokio::test]
    async fn test_focus_inside_focused_suite_narrows() {
        let mut registry = Registry::new();
        registry.fdescribe("f", |r| {
            Box::pin(async move {
                r.it("b", noop);
                r.fit("c", noop);
                Ok(())
            })
        });

        let tests = resolved(&mut registry).await;
        assert_eq!(runnable(&registry, &tests), vec!["f c"]);
    }

    #[tokio::test]
    async fn test_skipped_suite_skips_descendants() {
        let mut registry = Registry::new();
        registry.xdescribe("x", |r| {
            Box::pin(async move {
                r.describe("deep", |r| {
                    Box::pin(async move {
                        r.it("a", noop);
                        Ok(())
                    })
                });
                Ok(())
            })
        });
        registry.it("b", noop);

        let tests = resolved(&mut registry).await;
        assert_eq!(runnable(&registry, &tests), vec!["b"]);
    }

    #[tokio::test]
    async fn test_focused_test_in_skipped_suite_runs() {
        let mut registry = Registry::new();
        registry.xdescribe("x", |r| {
            Box::pin(async move {
                r.fit("a", noop);
                r.it("b", noop);
                Ok(())
            })
        });

        let tests = resolved(&mut registry).await;
        assert_eq!(runnable(&registry, &tests), vec!["x a"]);
    }

    #[tokio::test]
    async fn test_focus_set_after_declaration() {
        let mut registry = Registry::new();
        let a = registry.it("a", noop);
        registry.it("b", noop);

        let tests = resolved(&mut registry).await;
        assert_eq!(runnable(&registry, &tests).len(), 2);

        registry.test_mut(a).set_focused(true);
        assert_eq!(runnable(&registry, &tests), vec!["a"]);
        assert!(registry.has_focused_descendant(registry.root()));
    }
}
