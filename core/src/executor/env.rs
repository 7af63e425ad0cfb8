use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Execution environment attached to one stack handle.
///
/// Runners read it when they launch the backend; it never touches the
/// process environment, so concurrent units cannot see each other's values.
#[derive(Debug, Clone, Default)]
pub struct StackEnv {
    vars: Arc<Mutex<BTreeMap<String, String>>>,
}

impl StackEnv {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        match self.vars.lock() {
            Ok(vars) => vars,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Set `key`, returning the previous value.
    pub fn set(&self, key: &str, value: &str) -> Option<String> {
        self.lock().insert(key.to_string(), value.to_string())
    }

    pub fn unset(&self, key: &str) -> Option<String> {
        self.lock().remove(key)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Overrides applied to a [`StackEnv`] for the lifetime of the guard.
///
/// Dropping the guard restores every key to its prior state. Drop runs on
/// normal return, on `?` early exit, when the owning future is cancelled and
/// while unwinding from a panic.
#[must_use = "overrides are removed as soon as the scope is dropped"]
#[derive(Debug)]
pub struct EnvScope {
    env: StackEnv,
    previous: Vec<(String, Option<String>)>,
}

impl EnvScope {
    pub fn acquire(env: &StackEnv, overrides: &BTreeMap<String, String>) -> Self {
        let previous = overrides
            .iter()
            .map(|(key, value)| (key.clone(), env.set(key, value)))
            .collect();
        Self {
            env: env.clone(),
            previous,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.previous.iter().map(|(k, _)| k.as_str())
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        for (key, prior) in self.previous.drain(..).rev() {
            match prior {
                Some(value) => {
                    self.env.set(&key, &value);
                }
                None => {
                    self.env.unset(&key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn overrides(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn overrides_visible_only_inside_scope() {
        let env = StackEnv::new();
        {
            let scope = EnvScope::acquire(&env, &overrides(&[("REGION", "us-east-1")]));
            assert_eq!(env.get("REGION").as_deref(), Some("us-east-1"));
            assert_eq!(scope.keys().collect::<Vec<_>>(), vec!["REGION"]);
        }
        assert!(env.is_empty());
    }

    #[test]
    fn restores_prior_values() {
        let env = StackEnv::new();
        env.set("AWS_PROFILE", "base");
        {
            let _scope = EnvScope::acquire(
                &env,
                &overrides(&[("AWS_PROFILE", "prod"), ("EXTRA", "1")]),
            );
            assert_eq!(env.get("AWS_PROFILE").as_deref(), Some("prod"));
        }
        assert_eq!(env.get("AWS_PROFILE").as_deref(), Some("base"));
        assert_eq!(env.get("EXTRA"), None);
    }

    #[test]
    fn cleanup_runs_when_the_operation_panics() {
        let env = StackEnv::new();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _scope = EnvScope::acquire(&env, &overrides(&[("TOKEN", "secret")]));
            assert_eq!(env.get("TOKEN").as_deref(), Some("secret"));
            panic!("backend blew up");
        }));
        assert!(result.is_err());
        assert_eq!(env.get("TOKEN"), None);
    }

    #[test]
    fn nested_scopes_unwind_in_order() {
        let env = StackEnv::new();
        let outer = EnvScope::acquire(&env, &overrides(&[("A", "outer")]));
        {
            let _inner = EnvScope::acquire(&env, &overrides(&[("A", "inner")]));
            assert_eq!(env.get("A").as_deref(), Some("inner"));
        }
        assert_eq!(env.get("A").as_deref(), Some("outer"));
        drop(outer);
        assert_eq!(env.get("A"), None);
    }

    #[tokio::test]
    async fn cleanup_runs_when_the_future_is_dropped() {
        let env = StackEnv::new();
        let scoped = {
            let env = env.clone();
            async move {
                let _scope = EnvScope::acquire(&env, &overrides(&[("STAGE", "x")]));
                std::future::pending::<()>().await;
            }
        };
        let _ = tokio::time::timeout(std::time::Duration::from_millis(10), scoped).await;
        assert_eq!(env.get("STAGE"), None);
    }
}
