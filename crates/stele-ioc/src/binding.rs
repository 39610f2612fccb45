//! Bindings
//!
//! A [`ClassBinding`] maps a requested type (plus optional qualifier) to a
//! resolution strategy. The strategies are mutually exclusive in intent and
//! consulted in a fixed priority order:
//!
//! 1. explicit instance
//! 2. explicit provider instance
//! 3. provider class, instantiated through the injector
//! 4. implementation class, instantiated by the default provider
//!
//! Scope handling is lazy: when no scope was set explicitly and the
//! implementation class carries a `Singleton` annotation, the singleton
//! scope is applied before the first instantiation.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;

use stele_reflect::{Annotatable, Instance, ReflectionClass};

use crate::error::BindingError;
use crate::injector::Injector;
use crate::provider::{self, ConstructingProvider, InjectionProvider, ValueProvider};
use crate::scope::BindingScope;

/// Scope selected at configuration time.
pub(crate) enum ScopeChoice {
    /// Nothing chosen; a `Singleton` annotation on the implementation class
    /// may still apply the singleton scope
    Default,
    /// The singleton scope
    Singleton,
    /// The installed session scope
    Session,
    /// A host-supplied scope
    Custom(Arc<dyn BindingScope>),
}

/// Lazily resolved runtime state of a binding.
#[derive(Default)]
struct ResolvedState {
    provider: Option<Arc<dyn InjectionProvider>>,
    /// Outer `None` = not checked yet; inner `None` = no scope applies
    auto_scope: Option<Option<Arc<dyn BindingScope>>>,
}

/// Binding of a type to an implementation, instance, or provider.
pub struct ClassBinding {
    ty: String,
    name: Option<String>,
    impl_class: String,
    instance: Option<Instance>,
    provider: Option<Arc<dyn InjectionProvider>>,
    provider_class: Option<String>,
    scope: ScopeChoice,
    resolved: Mutex<ResolvedState>,
}

impl ClassBinding {
    pub(crate) fn new(ty: impl Into<String>) -> Self {
        let ty = ty.into();
        Self {
            impl_class: ty.clone(),
            ty,
            name: None,
            instance: None,
            provider: None,
            provider_class: None,
            scope: ScopeChoice::Default,
            resolved: Mutex::new(ResolvedState::default()),
        }
    }

    /// Set the concrete implementation class.
    pub fn to(&mut self, impl_class: impl Into<String>) -> &mut Self {
        self.impl_class = impl_class.into();
        self
    }

    /// Bind to a pre-built instance. Takes priority over every other
    /// strategy.
    pub fn to_instance(&mut self, instance: impl Any + Send + Sync) -> &mut Self {
        self.instance = Some(Arc::new(instance));
        self
    }

    /// Bind to an already type-erased instance.
    pub fn to_shared_instance(&mut self, instance: Instance) -> &mut Self {
        self.instance = Some(instance);
        self
    }

    /// Bind to a provider instance.
    pub fn to_provider(&mut self, provider: impl InjectionProvider + 'static) -> &mut Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Bind to a provider class; it is instantiated through the injector on
    /// first use and must produce the provider capability.
    pub fn to_provider_class(&mut self, provider_class: impl Into<String>) -> &mut Self {
        self.provider_class = Some(provider_class.into());
        self
    }

    /// Qualify the binding with a name; the key becomes `type#name`.
    pub fn named(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Bind in the singleton scope.
    pub fn as_singleton(&mut self) -> &mut Self {
        self.scope = ScopeChoice::Singleton;
        self
    }

    /// Bind in the installed session scope.
    pub fn in_session(&mut self) -> &mut Self {
        self.scope = ScopeChoice::Session;
        self
    }

    /// Bind in a host-supplied scope.
    pub fn in_scope(&mut self, scope: Arc<dyn BindingScope>) -> &mut Self {
        self.scope = ScopeChoice::Custom(scope);
        self
    }

    /// The unique key of this binding: `type`, or `type#name` when
    /// qualified.
    pub fn key(&self) -> String {
        match &self.name {
            Some(name) => format!("{}#{}", self.ty, name),
            None => self.ty.clone(),
        }
    }

    /// The bound type.
    pub fn ty(&self) -> &str {
        &self.ty
    }

    /// Produce (or reuse, under an active scope) the bound instance.
    pub(crate) fn get_instance(&self, injector: &Injector) -> Result<Instance, BindingError> {
        if let Some(instance) = &self.instance {
            return Ok(instance.clone());
        }

        let class = injector.reflector().class(&self.impl_class)?;
        let scope = self.effective_scope(injector, &class)?;
        let provider = self.effective_provider(injector, &class)?;

        match scope {
            Some(scope) => scope.get_instance(&self.impl_class, provider.as_ref(), injector),
            None => provider.get(injector, self.name.as_deref()),
        }
    }

    fn effective_scope(
        &self,
        injector: &Injector,
        class: &ReflectionClass,
    ) -> Result<Option<Arc<dyn BindingScope>>, BindingError> {
        match &self.scope {
            ScopeChoice::Singleton => Ok(Some(injector.scopes().singleton())),
            ScopeChoice::Session => injector.scopes().session().map(Some),
            ScopeChoice::Custom(scope) => Ok(Some(scope.clone())),
            ScopeChoice::Default => {
                if let Some(checked) = self.resolved.lock().auto_scope.clone() {
                    return Ok(checked);
                }
                let detected = if class.has_annotation("Singleton") {
                    Some(injector.scopes().singleton())
                } else {
                    None
                };
                Ok(self
                    .resolved
                    .lock()
                    .auto_scope
                    .get_or_insert(detected)
                    .clone())
            }
        }
    }

    fn effective_provider(
        &self,
        injector: &Injector,
        class: &ReflectionClass,
    ) -> Result<Arc<dyn InjectionProvider>, BindingError> {
        if let Some(cached) = self.resolved.lock().provider.clone() {
            return Ok(cached);
        }

        let provider: Arc<dyn InjectionProvider> = if let Some(provider) = &self.provider {
            provider.clone()
        } else if let Some(provider_class) = &self.provider_class {
            // instantiated through the injector, outside our state lock
            let instance = injector.instance(provider_class)?;
            provider::as_provider(&instance).ok_or_else(|| BindingError::NotAProvider {
                class: provider_class.clone(),
                ty: self.ty.clone(),
            })?
        } else {
            Arc::new(ConstructingProvider::new(class.clone()))
        };

        Ok(self
            .resolved
            .lock()
            .provider
            .get_or_insert(provider)
            .clone())
    }
}

/// Binding of a plain named value.
///
/// Constants satisfy the untyped injection points that class bindings
/// cannot: a setter parameter carrying only a `Named` hint resolves here.
pub struct ConstantBinding {
    name: String,
    provider: Option<Arc<dyn InjectionProvider>>,
    provider_class: Option<String>,
    resolved: Mutex<Option<Arc<dyn InjectionProvider>>>,
}

impl ConstantBinding {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: None,
            provider_class: None,
            resolved: Mutex::new(None),
        }
    }

    /// Bind the constant to a fixed value.
    pub fn to_value(&mut self, value: impl Any + Send + Sync) -> &mut Self {
        self.provider = Some(Arc::new(ValueProvider::new(value)));
        self
    }

    /// Bind the constant to a provider instance.
    pub fn to_provider(&mut self, provider: impl InjectionProvider + 'static) -> &mut Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Bind the constant to a provider class; it is instantiated through the
    /// injector on first use and must produce the provider capability.
    pub fn to_provider_class(&mut self, provider_class: impl Into<String>) -> &mut Self {
        self.provider_class = Some(provider_class.into());
        self
    }

    /// The constant's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn get_value(&self, injector: &Injector) -> Result<Instance, BindingError> {
        if let Some(cached) = self.resolved.lock().clone() {
            return cached.get(injector, Some(&self.name));
        }

        let provider: Arc<dyn InjectionProvider> = if let Some(provider) = &self.provider {
            provider.clone()
        } else if let Some(provider_class) = &self.provider_class {
            let instance = injector.instance(provider_class)?;
            provider::as_provider(&instance).ok_or_else(|| BindingError::NotAProvider {
                class: provider_class.clone(),
                ty: format!("constant {}", self.name),
            })?
        } else {
            return Err(BindingError::UnknownConstant {
                name: self.name.clone(),
            });
        };

        let provider = self.resolved.lock().get_or_insert(provider).clone();
        provider.get(injector, Some(&self.name))
    }
}
