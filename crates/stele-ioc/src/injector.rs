//! Injector
//!
//! Resolves bindings at call time. Every resolution tracks its ancestry so a
//! type reappearing in its own dependency chain fails fast with
//! [`BindingError::CircularDependency`] instead of recursing forever.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use stele_reflect::{Instance, Reflector};

use crate::binding::{ClassBinding, ConstantBinding};
use crate::error::BindingError;
use crate::scope::BindingScopes;

/// Resolves the dependency graph described by the bindings.
pub struct Injector {
    reflector: Reflector,
    bindings: FxHashMap<String, ClassBinding>,
    constants: FxHashMap<String, ConstantBinding>,
    scopes: BindingScopes,
    resolving: Mutex<Vec<String>>,
}

impl Injector {
    pub(crate) fn new(
        reflector: Reflector,
        bindings: FxHashMap<String, ClassBinding>,
        constants: FxHashMap<String, ConstantBinding>,
        scopes: BindingScopes,
    ) -> Self {
        Self {
            reflector,
            bindings,
            constants,
            scopes,
            resolving: Mutex::new(Vec::new()),
        }
    }

    /// Resolve the binding for the given type.
    pub fn instance(&self, ty: &str) -> Result<Instance, BindingError> {
        self.named_instance(ty, None)
    }

    /// Resolve the binding for the given type and qualifier.
    pub fn named_instance(&self, ty: &str, name: Option<&str>) -> Result<Instance, BindingError> {
        let key = binding_key(ty, name);
        let binding = self
            .bindings
            .get(&key)
            .ok_or_else(|| BindingError::UnknownBinding { key: key.clone() })?;

        let _guard = self.enter(&key)?;
        binding.get_instance(self)
    }

    /// Resolve and downcast to the concrete type.
    pub fn instance_as<T: Any + Send + Sync>(&self, ty: &str) -> Result<Arc<T>, BindingError> {
        self.instance(ty)?
            .downcast::<T>()
            .map_err(|_| BindingError::TypeMismatch { key: ty.to_string() })
    }

    /// Whether a binding exists for the given type.
    pub fn has_binding(&self, ty: &str) -> bool {
        self.bindings.contains_key(ty)
    }

    /// Whether a binding exists for the given type and qualifier.
    pub fn has_named_binding(&self, ty: &str, name: &str) -> bool {
        self.bindings.contains_key(&binding_key(ty, Some(name)))
    }

    /// Resolve a named constant.
    pub fn constant(&self, name: &str) -> Result<Instance, BindingError> {
        let constant = self
            .constants
            .get(name)
            .ok_or_else(|| BindingError::UnknownConstant {
                name: name.to_string(),
            })?;
        constant.get_value(self)
    }

    /// Resolve a named constant and downcast to the concrete type.
    pub fn constant_as<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, BindingError> {
        self.constant(name)?
            .downcast::<T>()
            .map_err(|_| BindingError::TypeMismatch {
                key: name.to_string(),
            })
    }

    /// Whether a constant of the given name is bound.
    pub fn has_constant(&self, name: &str) -> bool {
        self.constants.contains_key(name)
    }

    /// The reflector serving declaration metadata and annotations.
    pub fn reflector(&self) -> &Reflector {
        &self.reflector
    }

    /// The scopes available to this injector's bindings.
    pub fn scopes(&self) -> &BindingScopes {
        &self.scopes
    }

    /// Push the key onto the in-progress resolution chain, failing when it
    /// is already being resolved further up the stack.
    fn enter(&self, key: &str) -> Result<ResolveGuard<'_>, BindingError> {
        let mut resolving = self.resolving.lock();
        if resolving.iter().any(|k| k == key) {
            let mut chain = resolving.clone();
            chain.push(key.to_string());
            return Err(BindingError::CircularDependency { chain });
        }

        resolving.push(key.to_string());
        Ok(ResolveGuard {
            resolving: &self.resolving,
        })
    }
}

fn binding_key(ty: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{}#{}", ty, name),
        None => ty.to_string(),
    }
}

/// Pops the resolution chain when a resolution frame ends, error or not.
struct ResolveGuard<'a> {
    resolving: &'a Mutex<Vec<String>>,
}

impl Drop for ResolveGuard<'_> {
    fn drop(&mut self) {
        self.resolving.lock().pop();
    }
}
