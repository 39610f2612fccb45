//! Reflection wrappers
//!
//! [`Reflector`] is the entry point: it owns the [`ClassRegistry`] and the
//! shared [`AnnotationFactory`] (behind one mutex), and hands out
//! [`ReflectionClass`] / [`ReflectionMethod`] / [`ReflectionProperty`]
//! wrappers. Every wrapper implements [`Annotatable`] by delegating to the
//! factory with its deterministic target identifier:
//!
//! | declaration       | target              |
//! |-------------------|---------------------|
//! | class             | `Queue`             |
//! | method            | `Queue::push()`     |
//! | instance property | `Queue->capacity`   |
//! | static property   | `Queue::$capacity`  |

pub mod decl;
pub mod primitive;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::annotation::factory::AnnotationFactory;
use crate::annotation::{Annotation, AnnotationError, Annotations};
use decl::{ClassDecl, ClassRegistry, MethodDecl, PropertyDecl};

/// Error raised by registry lookups.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReflectError {
    /// No class of this name is registered
    #[error("class {name} is not registered")]
    UnknownClass {
        /// Requested class name
        name: String,
    },

    /// The class declares no such method, not even through its parents
    #[error("class {class} has no method {name}")]
    UnknownMethod {
        /// Class the lookup started from
        class: String,
        /// Requested method name
        name: String,
    },

    /// The class declares no such property, not even through its parents
    #[error("class {class} has no property {name}")]
    UnknownProperty {
        /// Class the lookup started from
        class: String,
        /// Requested property name
        name: String,
    },
}

/// Capability contract shared by all reflected declarations that can carry
/// annotations.
pub trait Annotatable {
    /// Whether the declaration carries the given annotation.
    fn has_annotation(&self, name: &str) -> bool;

    /// The annotation of the given name; fails with
    /// [`AnnotationError::NotFound`] when absent.
    fn annotation(&self, name: &str) -> Result<Annotation, AnnotationError>;

    /// All annotations of the declaration in encounter order, duplicates
    /// preserved.
    fn annotations(&self) -> Annotations;
}

// ============================================================================
// Reflector
// ============================================================================

struct ReflectorInner {
    registry: ClassRegistry,
    factory: Mutex<AnnotationFactory>,
}

/// Handle to the registry and the shared annotation machinery.
///
/// Cheap to clone; clones share registry, cache, and parse memo.
#[derive(Clone)]
pub struct Reflector {
    inner: Arc<ReflectorInner>,
}

impl Reflector {
    /// Create a reflector with a fresh annotation factory.
    pub fn new(registry: ClassRegistry) -> Self {
        Self::with_factory(registry, AnnotationFactory::new())
    }

    /// Create a reflector around a pre-configured factory, e.g. one whose
    /// cache persists to a file.
    pub fn with_factory(registry: ClassRegistry, factory: AnnotationFactory) -> Self {
        Self {
            inner: Arc::new(ReflectorInner {
                registry,
                factory: Mutex::new(factory),
            }),
        }
    }

    /// Reflect the class of the given name.
    pub fn class(&self, name: &str) -> Result<ReflectionClass, ReflectError> {
        let decl = self
            .inner
            .registry
            .get(name)
            .ok_or_else(|| ReflectError::UnknownClass {
                name: name.to_string(),
            })?;
        Ok(ReflectionClass {
            reflector: self.clone(),
            decl,
        })
    }

    /// The class registry.
    pub fn registry(&self) -> &ClassRegistry {
        &self.inner.registry
    }

    /// How many comments the shared factory has parsed so far.
    pub fn parse_count(&self) -> usize {
        self.inner.factory.lock().parse_count()
    }

    /// Clear the shared annotation cache and parse memo (test isolation).
    pub fn stop(&self) {
        self.inner.factory.lock().stop();
    }

    fn factory(&self) -> MutexGuard<'_, AnnotationFactory> {
        self.inner.factory.lock()
    }
}

impl fmt::Debug for Reflector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reflector")
            .field("classes", &self.inner.registry.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ReflectionClass
// ============================================================================

/// A reflected class.
#[derive(Clone)]
pub struct ReflectionClass {
    reflector: Reflector,
    decl: Arc<ClassDecl>,
}

impl ReflectionClass {
    /// Class name.
    pub fn name(&self) -> &str {
        self.decl.name()
    }

    /// The underlying declaration record.
    pub fn decl(&self) -> &Arc<ClassDecl> {
        &self.decl
    }

    /// The reflector this wrapper was obtained from.
    pub fn reflector(&self) -> &Reflector {
        &self.reflector
    }

    /// The parent class, when one is declared and registered.
    pub fn parent(&self) -> Option<ReflectionClass> {
        let parent = self.decl.parent()?;
        self.reflector.class(parent).ok()
    }

    /// Reflect a method, searching the parent chain for inherited ones.
    pub fn method(&self, name: &str) -> Result<ReflectionMethod, ReflectError> {
        let mut current = Some(self.decl.clone());
        while let Some(decl) = current {
            if let Some(method) = decl.method(name) {
                return Ok(ReflectionMethod {
                    origin: self.clone(),
                    declaring: decl.clone(),
                    decl: method.clone(),
                });
            }
            current = decl.parent().and_then(|p| self.reflector.inner.registry.get(p));
        }

        Err(ReflectError::UnknownMethod {
            class: self.name().to_string(),
            name: name.to_string(),
        })
    }

    /// All methods, inherited ones included; an override shadows the
    /// inherited declaration.
    pub fn methods(&self) -> Vec<ReflectionMethod> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        let mut current = Some(self.decl.clone());
        while let Some(decl) = current {
            for method in decl.methods() {
                if seen.insert(method.name().to_string()) {
                    out.push(ReflectionMethod {
                        origin: self.clone(),
                        declaring: decl.clone(),
                        decl: method.clone(),
                    });
                }
            }
            current = decl.parent().and_then(|p| self.reflector.inner.registry.get(p));
        }
        out
    }

    /// Reflect a property, searching the parent chain for inherited ones.
    pub fn property(&self, name: &str) -> Result<ReflectionProperty, ReflectError> {
        let mut current = Some(self.decl.clone());
        while let Some(decl) = current {
            if let Some(property) = decl.property(name) {
                return Ok(ReflectionProperty {
                    origin: self.clone(),
                    declaring: decl.clone(),
                    decl: property.clone(),
                });
            }
            current = decl.parent().and_then(|p| self.reflector.inner.registry.get(p));
        }

        Err(ReflectError::UnknownProperty {
            class: self.name().to_string(),
            name: name.to_string(),
        })
    }

    /// All properties, inherited ones included; a redeclaration shadows the
    /// inherited one.
    pub fn properties(&self) -> Vec<ReflectionProperty> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        let mut current = Some(self.decl.clone());
        while let Some(decl) = current {
            for property in decl.properties() {
                if seen.insert(property.name().to_string()) {
                    out.push(ReflectionProperty {
                        origin: self.clone(),
                        declaring: decl.clone(),
                        decl: property.clone(),
                    });
                }
            }
            current = decl.parent().and_then(|p| self.reflector.inner.registry.get(p));
        }
        out
    }

    /// Annotations of the constructor declaration, under the synthetic
    /// target `Class::new()`. Empty when no constructor is declared.
    pub fn constructor_annotations(&self) -> Annotations {
        match self.decl.constructor() {
            Some(ctor) => {
                let target = format!("{}::new()", self.name());
                self.reflector
                    .factory()
                    .create_all(ctor.doc().unwrap_or(""), &target)
            }
            None => Annotations::new(),
        }
    }

    fn doc(&self) -> &str {
        self.decl.doc().unwrap_or("")
    }
}

impl Annotatable for ReflectionClass {
    fn has_annotation(&self, name: &str) -> bool {
        self.reflector.factory().has(self.doc(), name, self.name())
    }

    fn annotation(&self, name: &str) -> Result<Annotation, AnnotationError> {
        self.reflector.factory().create(self.doc(), name, self.name())
    }

    fn annotations(&self) -> Annotations {
        self.reflector.factory().create_all(self.doc(), self.name())
    }
}

impl PartialEq for ReflectionClass {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for ReflectionClass {}

impl Hash for ReflectionClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl fmt::Debug for ReflectionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReflectionClass[{}]", self.name())
    }
}

impl fmt::Display for ReflectionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReflectionClass[{}]", self.name())
    }
}

// ============================================================================
// ReflectionMethod
// ============================================================================

/// A reflected method, obtained through a [`ReflectionClass`].
#[derive(Clone)]
pub struct ReflectionMethod {
    /// Class the reflector was obtained through (not necessarily the declarer)
    origin: ReflectionClass,
    declaring: Arc<ClassDecl>,
    decl: Arc<MethodDecl>,
}

impl ReflectionMethod {
    /// Method name.
    pub fn name(&self) -> &str {
        self.decl.name()
    }

    /// Whether the method is static.
    pub fn is_static(&self) -> bool {
        self.decl.is_static()
    }

    /// The underlying declaration record.
    pub fn decl(&self) -> &Arc<MethodDecl> {
        &self.decl
    }

    /// Target identifier, e.g. `Queue::push()`.
    pub fn target(&self) -> String {
        format!("{}::{}()", self.origin.name(), self.name())
    }

    /// The class that physically declares this method.
    ///
    /// For a method inherited through a subclass reflector this is the
    /// superclass; the originally supplied wrapper is reused when it is
    /// itself the declarer.
    pub fn declaring_class(&self) -> ReflectionClass {
        if self.declaring.name() == self.origin.name() {
            self.origin.clone()
        } else {
            ReflectionClass {
                reflector: self.origin.reflector.clone(),
                decl: self.declaring.clone(),
            }
        }
    }

    fn doc(&self) -> &str {
        self.decl.doc().unwrap_or("")
    }
}

impl Annotatable for ReflectionMethod {
    fn has_annotation(&self, name: &str) -> bool {
        self.origin.reflector.factory().has(self.doc(), name, &self.target())
    }

    fn annotation(&self, name: &str) -> Result<Annotation, AnnotationError> {
        self.origin.reflector.factory().create(self.doc(), name, &self.target())
    }

    fn annotations(&self) -> Annotations {
        self.origin.reflector.factory().create_all(self.doc(), &self.target())
    }
}

impl PartialEq for ReflectionMethod {
    fn eq(&self, other: &Self) -> bool {
        self.origin.name() == other.origin.name() && self.name() == other.name()
    }
}

impl Eq for ReflectionMethod {}

impl Hash for ReflectionMethod {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.origin.name().hash(state);
        self.name().hash(state);
    }
}

impl fmt::Debug for ReflectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReflectionMethod[{}]", self.target())
    }
}

impl fmt::Display for ReflectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReflectionMethod[{}]", self.target())
    }
}

// ============================================================================
// ReflectionProperty
// ============================================================================

/// A reflected property, obtained through a [`ReflectionClass`].
#[derive(Clone)]
pub struct ReflectionProperty {
    origin: ReflectionClass,
    declaring: Arc<ClassDecl>,
    decl: Arc<PropertyDecl>,
}

impl ReflectionProperty {
    /// Property name.
    pub fn name(&self) -> &str {
        self.decl.name()
    }

    /// Whether the property is static.
    pub fn is_static(&self) -> bool {
        self.decl.is_static()
    }

    /// Target identifier: `Queue->capacity` for instance properties,
    /// `Queue::$capacity` for static ones.
    pub fn target(&self) -> String {
        if self.is_static() {
            format!("{}::${}", self.origin.name(), self.name())
        } else {
            format!("{}->{}", self.origin.name(), self.name())
        }
    }

    /// The class that physically declares this property.
    pub fn declaring_class(&self) -> ReflectionClass {
        if self.declaring.name() == self.origin.name() {
            self.origin.clone()
        } else {
            ReflectionClass {
                reflector: self.origin.reflector.clone(),
                decl: self.declaring.clone(),
            }
        }
    }

    fn doc(&self) -> &str {
        self.decl.doc().unwrap_or("")
    }
}

impl Annotatable for ReflectionProperty {
    fn has_annotation(&self, name: &str) -> bool {
        self.origin.reflector.factory().has(self.doc(), name, &self.target())
    }

    fn annotation(&self, name: &str) -> Result<Annotation, AnnotationError> {
        self.origin.reflector.factory().create(self.doc(), name, &self.target())
    }

    fn annotations(&self) -> Annotations {
        self.origin.reflector.factory().create_all(self.doc(), &self.target())
    }
}

impl PartialEq for ReflectionProperty {
    fn eq(&self, other: &Self) -> bool {
        self.origin.name() == other.origin.name() && self.name() == other.name()
    }
}

impl Eq for ReflectionProperty {}

impl Hash for ReflectionProperty {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.origin.name().hash(state);
        self.name().hash(state);
    }
}

impl fmt::Debug for ReflectionProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReflectionProperty[{}]", self.target())
    }
}

impl fmt::Display for ReflectionProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReflectionProperty[{}]", self.target())
    }
}
