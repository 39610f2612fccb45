//! Stele Reflection
//!
//! Annotation parsing, caching, and declaration reflection:
//! - **Annotation**: scanner, typed values, process-wide cache with optional
//!   byte-store persistence, and the factory tying them together
//!   (`annotation` module)
//! - **Reflect**: declaration registry and the class/method/property
//!   wrappers exposing annotation queries (`reflect` module)
//!
//! # Example
//!
//! ```
//! use stele_reflect::reflect::decl::{ClassDecl, ClassRegistry};
//! use stele_reflect::reflect::{Annotatable, Reflector};
//!
//! let mut registry = ClassRegistry::new();
//! registry.register(
//!     ClassDecl::new("Queue").with_doc("/**\n * @Singleton\n */"),
//! );
//!
//! let reflector = Reflector::new(registry);
//! let class = reflector.class("Queue").unwrap();
//! assert!(class.has_annotation("Singleton"));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod annotation;
pub mod reflect;

pub use annotation::cache::{AnnotationCache, CacheEntry, CacheError, CacheStats, CacheStore, FileStore};
pub use annotation::factory::AnnotationFactory;
pub use annotation::parser::{ParseError, ParseErrorKind, ParsedComment, RawAnnotation};
pub use annotation::{Annotation, AnnotationError, AnnotationValue, Annotations};
pub use reflect::decl::{
    ClassDecl, ClassRegistry, ConstructorDecl, Instance, MethodDecl, ParamDecl, PropertyDecl,
    ThunkError, TypeRef,
};
pub use reflect::primitive::Primitive;
pub use reflect::{
    Annotatable, ReflectError, ReflectionClass, ReflectionMethod, ReflectionProperty, Reflector,
};
