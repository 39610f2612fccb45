//! Container error types

use thiserror::Error;

use stele_reflect::{ReflectError, ThunkError};

/// Unresolvable or misconfigured binding.
///
/// Always surfaced to the caller; the container never substitutes a default
/// value for a failed resolution.
#[derive(Debug, Error)]
pub enum BindingError {
    /// No binding is registered under the requested key
    #[error("no binding for {key}")]
    UnknownBinding {
        /// Requested binding key (`type` or `type#name`)
        key: String,
    },

    /// No constant is registered under the requested name
    #[error("no constant named {name}")]
    UnknownConstant {
        /// Requested constant name
        name: String,
    },

    /// A configured provider class produced something that is not a provider
    #[error("configured provider class {class} for type {ty} does not provide the injection capability")]
    NotAProvider {
        /// The provider class that was instantiated
        class: String,
        /// The bound type the provider was configured for
        ty: String,
    },

    /// A type reappeared in its own resolution ancestry
    #[error("circular dependency: {}", chain.join(" -> "))]
    CircularDependency {
        /// The resolution chain, ending with the repeated key
        chain: Vec<String>,
    },

    /// A required dependency of an injection point could not be resolved
    #[error("can not resolve dependency {param} of {target}")]
    UnresolvedDependency {
        /// The injection point, e.g. `Car::new()` or `Car::set_radio()`
        target: String,
        /// The parameter that failed
        param: String,
        /// The underlying failure
        #[source]
        source: Box<BindingError>,
    },

    /// The implementation class declares no constructor
    #[error("class {class} declares no constructor")]
    NoConstructor {
        /// The implementation class
        class: String,
    },

    /// A construction or setter thunk failed
    #[error("construction of {class} failed")]
    Construction {
        /// The class being constructed
        class: String,
        /// The thunk failure
        #[source]
        source: ThunkError,
    },

    /// A bound instance does not downcast to the requested concrete type
    #[error("bound instance for {key} has an unexpected concrete type")]
    TypeMismatch {
        /// The binding key that was resolved
        key: String,
    },

    /// `in_session` was used but no session scope is installed
    #[error("no session scope installed")]
    NoSessionScope,

    /// The implementation class is not present in the registry
    #[error(transparent)]
    Reflect(#[from] ReflectError),
}

impl BindingError {
    /// Whether this failure means "nothing is bound", as opposed to a bound
    /// thing going wrong. Optional injection points skip on exactly these.
    pub fn is_unbound(&self) -> bool {
        matches!(
            self,
            BindingError::UnknownBinding { .. } | BindingError::UnknownConstant { .. }
        )
    }
}
