//! Injection providers
//!
//! A provider produces instances of a bound type on demand. Bindings consult
//! an explicit provider when one is configured; otherwise the
//! [`ConstructingProvider`] instantiates the implementation class through its
//! declared constructor, resolving annotated injection points against the
//! injector.

use std::any::Any;
use std::sync::Arc;

use stele_reflect::{
    Annotatable, Annotations, Instance, ParamDecl, ReflectionClass, TypeRef,
};

use crate::error::BindingError;
use crate::injector::Injector;

/// Factory capability producing instances of a bound type.
pub trait InjectionProvider: Send + Sync {
    /// Produce an instance.
    ///
    /// `name` carries the binding qualifier, when one is present.
    fn get(&self, injector: &Injector, name: Option<&str>) -> Result<Instance, BindingError>;
}

/// Provider handing out one fixed, pre-built value.
pub struct ValueProvider {
    value: Instance,
}

impl ValueProvider {
    /// Wrap a value in a provider.
    pub fn new(value: impl Any + Send + Sync) -> Self {
        Self {
            value: Arc::new(value),
        }
    }

    /// Wrap an already type-erased instance in a provider.
    pub fn from_instance(value: Instance) -> Self {
        Self { value }
    }
}

impl InjectionProvider for ValueProvider {
    fn get(&self, _injector: &Injector, _name: Option<&str>) -> Result<Instance, BindingError> {
        Ok(self.value.clone())
    }
}

/// Type-erased holder for a provider built by a provider class.
///
/// A class bound via `to_provider_class` must have its constructor thunk
/// return one of these, so the container can recover the provider capability
/// from the type-erased instance. [`boxed_provider`] builds the instance;
/// [`as_provider`] recovers the capability.
pub struct BoxedProvider(Arc<dyn InjectionProvider>);

impl BoxedProvider {
    /// Box a provider.
    pub fn new(provider: impl InjectionProvider + 'static) -> Self {
        Self(Arc::new(provider))
    }
}

/// Wrap a provider into an [`Instance`], as a provider class's constructor
/// thunk must.
pub fn boxed_provider(provider: impl InjectionProvider + 'static) -> Instance {
    Arc::new(BoxedProvider::new(provider))
}

/// Recover the provider capability from an instance, when it has one.
pub fn as_provider(instance: &Instance) -> Option<Arc<dyn InjectionProvider>> {
    instance
        .downcast_ref::<BoxedProvider>()
        .map(|boxed| boxed.0.clone())
}

/// Default provider: instantiates the implementation class through its
/// declared constructor and applies setter injection.
///
/// Constructor parameters are resolved when the constructor carries an
/// `Inject` annotation; a constructor without it is invoked with no
/// arguments. After construction, every method with a setter thunk and an
/// `Inject` annotation has its parameters resolved and applied;
/// `@Inject(optional=true)` setters are skipped when their dependency has no
/// binding.
pub struct ConstructingProvider {
    class: ReflectionClass,
}

impl ConstructingProvider {
    /// Create a provider constructing the given class.
    pub fn new(class: ReflectionClass) -> Self {
        Self { class }
    }

    fn construct(&self, injector: &Injector) -> Result<Instance, BindingError> {
        let decl = self.class.decl().clone();
        let class_name = self.class.name().to_string();
        let ctor = decl.constructor().ok_or_else(|| BindingError::NoConstructor {
            class: class_name.clone(),
        })?;

        let hints = self.class.constructor_annotations();
        let args = if hints.contains("Inject") {
            let target = format!("{}::new()", class_name);
            resolve_all(injector, &target, ctor.params(), &hints)?
        } else {
            Vec::new()
        };

        ctor.construct(&args).map_err(|source| BindingError::Construction {
            class: class_name,
            source,
        })
    }

    fn inject_setters(&self, injector: &Injector, instance: &Instance) -> Result<(), BindingError> {
        for method in self.class.methods() {
            let decl = method.decl().clone();
            let Some(setter) = decl.setter() else {
                continue;
            };
            if !method.has_annotation("Inject") {
                continue;
            }

            let hints = method.annotations();
            let optional = hints
                .named("Inject")
                .last()
                .and_then(|a| a.param("optional"))
                .and_then(|v| v.as_bool())
                .unwrap_or(false);

            let target = method.target();
            let args = match resolve_all(injector, &target, decl.params(), &hints) {
                Ok(args) => args,
                Err(BindingError::UnresolvedDependency { source, .. })
                    if optional && source.is_unbound() =>
                {
                    continue;
                }
                Err(e) => return Err(e),
            };

            setter(instance, &args).map_err(|source| BindingError::Construction {
                class: self.class.name().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}

impl InjectionProvider for ConstructingProvider {
    fn get(&self, injector: &Injector, _name: Option<&str>) -> Result<Instance, BindingError> {
        let instance = self.construct(injector)?;
        self.inject_setters(injector, &instance)?;
        Ok(instance)
    }
}

/// Resolve every parameter of an injection point, in declaration order.
fn resolve_all(
    injector: &Injector,
    target: &str,
    params: &[ParamDecl],
    hints: &Annotations,
) -> Result<Vec<Instance>, BindingError> {
    let mut args = Vec::with_capacity(params.len());
    for param in params {
        let qualifier = qualifier_for(param, params.len(), hints);
        let resolved = resolve_param(injector, param, qualifier.as_deref()).map_err(|source| {
            BindingError::UnresolvedDependency {
                target: target.to_string(),
                param: param.name().to_string(),
                source: Box::new(source),
            }
        })?;
        args.push(resolved);
    }
    Ok(args)
}

/// The `Named` qualifier applying to one parameter, if any.
///
/// Per-parameter qualifiers are given as named args (`@Named(engine='v8')`);
/// a bare `@Named('v8')` applies to single-parameter members only.
fn qualifier_for(param: &ParamDecl, param_count: usize, hints: &Annotations) -> Option<String> {
    let named = hints.named("Named").last()?;
    if let Some(value) = named.param(param.name()) {
        return value.as_str().map(str::to_string);
    }
    if param_count == 1 {
        return named.value().and_then(|v| v.as_str()).map(str::to_string);
    }
    None
}

/// Resolve one parameter: class types against the bindings, untyped and
/// primitive parameters against the named constants.
fn resolve_param(
    injector: &Injector,
    param: &ParamDecl,
    qualifier: Option<&str>,
) -> Result<Instance, BindingError> {
    match param.ty() {
        Some(TypeRef::Class(class_name)) => injector.named_instance(class_name, qualifier),
        Some(TypeRef::Primitive(_)) | None => {
            let name = qualifier.unwrap_or(param.name());
            injector.constant(name)
        }
    }
}
