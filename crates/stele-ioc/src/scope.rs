//! Binding scopes
//!
//! A scope decides whether a resolution reuses an earlier instance or asks
//! the provider for a fresh one. Without a scope every resolution constructs
//! anew; the [`SingletonScope`] hands out one instance per binding for the
//! lifetime of the injector; a session scope can be installed by the host.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use stele_reflect::Instance;

use crate::error::BindingError;
use crate::injector::Injector;
use crate::provider::InjectionProvider;

/// Policy governing instance reuse across resolutions.
pub trait BindingScope: Send + Sync {
    /// The instance for this binding key, created through the provider when
    /// the scope holds none yet.
    fn get_instance(
        &self,
        key: &str,
        provider: &dyn InjectionProvider,
        injector: &Injector,
    ) -> Result<Instance, BindingError>;
}

/// One instance per binding key for the lifetime of the injector.
#[derive(Default)]
pub struct SingletonScope {
    instances: Mutex<FxHashMap<String, Instance>>,
}

impl SingletonScope {
    /// Create an empty singleton scope.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BindingScope for SingletonScope {
    fn get_instance(
        &self,
        key: &str,
        provider: &dyn InjectionProvider,
        injector: &Injector,
    ) -> Result<Instance, BindingError> {
        if let Some(existing) = self.instances.lock().get(key) {
            return Ok(existing.clone());
        }

        // construct outside the lock: resolution may recurse into other
        // bindings living in this same scope
        let created = provider.get(injector, None)?;
        Ok(self
            .instances
            .lock()
            .entry(key.to_string())
            .or_insert(created)
            .clone())
    }
}

/// The scopes available to bindings of one injector.
pub struct BindingScopes {
    singleton: Arc<SingletonScope>,
    session: Mutex<Option<Arc<dyn BindingScope>>>,
}

impl Default for BindingScopes {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingScopes {
    /// Create scopes with an empty singleton scope and no session scope.
    pub fn new() -> Self {
        Self {
            singleton: Arc::new(SingletonScope::new()),
            session: Mutex::new(None),
        }
    }

    /// The singleton scope.
    pub fn singleton(&self) -> Arc<dyn BindingScope> {
        self.singleton.clone()
    }

    /// Install the session scope. Session state is a host concern; the
    /// container only delegates to whatever is installed here.
    pub fn set_session_scope(&self, scope: Arc<dyn BindingScope>) {
        *self.session.lock() = Some(scope);
    }

    /// The installed session scope.
    pub fn session(&self) -> Result<Arc<dyn BindingScope>, BindingError> {
        self.session.lock().clone().ok_or(BindingError::NoSessionScope)
    }
}
