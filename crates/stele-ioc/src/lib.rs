//! Stele IoC
//!
//! Annotation-driven dependency injection on top of `stele-reflect`:
//! - **Binder**: collects bindings of types to implementations, instances,
//!   or providers, plus named constants (`binder` module)
//! - **Injector**: resolves the binding graph at call time with cycle
//!   detection (`injector` module)
//! - **Scopes**: singleton and host-installable session scope
//!   (`scope` module)
//!
//! A binding without an explicit scope picks up the singleton scope
//! automatically when its implementation class carries a `@Singleton`
//! annotation; constructor and setter injection points are discovered
//! through `@Inject` and qualified with `@Named`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use stele_ioc::Binder;
//! use stele_reflect::reflect::decl::{ClassDecl, ClassRegistry, ConstructorDecl};
//! use stele_reflect::{Instance, Reflector};
//!
//! struct Clock;
//!
//! let mut registry = ClassRegistry::new();
//! registry.register(
//!     ClassDecl::new("Clock")
//!         .with_doc("/**\n * @Singleton\n */")
//!         .with_constructor(ConstructorDecl::new(|_| Ok(Arc::new(Clock) as Instance))),
//! );
//!
//! let mut binder = Binder::new();
//! binder.bind("Clock");
//! let injector = binder.build(Reflector::new(registry));
//!
//! let a = injector.instance("Clock").unwrap();
//! let b = injector.instance("Clock").unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod binder;
pub mod binding;
pub mod error;
pub mod injector;
pub mod provider;
pub mod scope;

pub use binder::{Binder, BindingModule};
pub use binding::{ClassBinding, ConstantBinding};
pub use error::BindingError;
pub use injector::Injector;
pub use provider::{
    as_provider, boxed_provider, BoxedProvider, ConstructingProvider, InjectionProvider,
    ValueProvider,
};
pub use scope::{BindingScope, BindingScopes, SingletonScope};
