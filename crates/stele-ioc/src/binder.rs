//! Binder
//!
//! Collects bindings and finalizes them into an [`Injector`]. Binding the
//! same key twice keeps the later binding.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use stele_reflect::Reflector;

use crate::binding::{ClassBinding, ConstantBinding};
use crate::injector::Injector;
use crate::scope::{BindingScope, BindingScopes};

/// A reusable set of binding configuration, applied to a binder.
pub trait BindingModule {
    /// Add this module's bindings.
    fn configure(&self, binder: &mut Binder);
}

/// Collects bindings for one injector.
#[derive(Default)]
pub struct Binder {
    bindings: Vec<ClassBinding>,
    constants: Vec<ConstantBinding>,
    scopes: BindingScopes,
}

impl Binder {
    /// Create an empty binder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a binder configured by the given modules.
    pub fn from_modules(modules: &[&dyn BindingModule]) -> Self {
        let mut binder = Self::new();
        for module in modules {
            module.configure(&mut binder);
        }
        binder
    }

    /// Start a binding for the given type. Without further configuration the
    /// type is bound to itself as implementation class.
    pub fn bind(&mut self, ty: impl Into<String>) -> &mut ClassBinding {
        self.bindings.push(ClassBinding::new(ty));
        self.bindings.last_mut().unwrap()
    }

    /// Start a constant binding under the given name.
    pub fn bind_constant(&mut self, name: impl Into<String>) -> &mut ConstantBinding {
        self.constants.push(ConstantBinding::new(name));
        self.constants.last_mut().unwrap()
    }

    /// Install the session scope used by `in_session` bindings.
    pub fn set_session_scope(&mut self, scope: Arc<dyn BindingScope>) {
        self.scopes.set_session_scope(scope);
    }

    /// Apply a binding module.
    pub fn install(&mut self, module: &dyn BindingModule) -> &mut Self {
        module.configure(self);
        self
    }

    /// Finalize the collected bindings into an injector resolving against
    /// the given reflector.
    pub fn build(self, reflector: Reflector) -> Injector {
        let mut bindings = FxHashMap::default();
        for binding in self.bindings {
            bindings.insert(binding.key(), binding);
        }

        let mut constants = FxHashMap::default();
        for constant in self.constants {
            constants.insert(constant.name().to_string(), constant);
        }

        Injector::new(reflector, bindings, constants, self.scopes)
    }
}
