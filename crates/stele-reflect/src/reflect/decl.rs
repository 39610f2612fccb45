//! Declaration metadata
//!
//! Rust has no runtime introspection, so the host describes its injectable
//! classes as explicit declaration records: a [`ClassDecl`] carries the doc
//! comment, parent class, properties, methods (with optional setter thunks),
//! and an optional constructor with a construction thunk. Records live in a
//! [`ClassRegistry`] and are served to the reflection wrappers and to the
//! container.
//!
//! Instances flow through the container as `Arc<dyn Any + Send + Sync>`; the
//! thunks are the only places that see concrete types.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::primitive::Primitive;

/// A type-erased instance produced by a constructor or provider.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Failure inside a user-supplied construction or setter thunk, e.g. a
/// dependency that does not downcast to the expected concrete type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ThunkError(String);

impl ThunkError {
    /// Create a thunk error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Construction thunk: resolved dependencies in, fresh instance out.
pub type ConstructFn = Box<dyn Fn(&[Instance]) -> Result<Instance, ThunkError> + Send + Sync>;

/// Setter thunk: applies resolved dependencies to an existing instance.
pub type SetterFn = Box<dyn Fn(&Instance, &[Instance]) -> Result<(), ThunkError> + Send + Sync>;

/// Reference to a parameter type: a primitive, or a class by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// A primitive type
    Primitive(Primitive),
    /// A class, identified by its registered name
    Class(String),
}

impl TypeRef {
    /// Classify a doc-comment type spelling: primitive spellings (including
    /// their aliases) become [`TypeRef::Primitive`], everything else is a
    /// class reference.
    pub fn from_name(name: &str) -> Self {
        match Primitive::for_name(name) {
            Some(primitive) => TypeRef::Primitive(primitive),
            None => TypeRef::Class(name.to_string()),
        }
    }
}

/// A declared method or constructor parameter.
///
/// A parameter without a type is a constant injection point: the container
/// resolves it against the named constants instead of the class bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    name: String,
    ty: Option<TypeRef>,
}

impl ParamDecl {
    /// A parameter of class type.
    pub fn class(name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: Some(TypeRef::Class(class_name.into())),
        }
    }

    /// A parameter of primitive type.
    pub fn primitive(name: impl Into<String>, primitive: Primitive) -> Self {
        Self {
            name: name.into(),
            ty: Some(TypeRef::Primitive(primitive)),
        }
    }

    /// An untyped parameter (constant injection point).
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
        }
    }

    /// A parameter typed by its doc-comment spelling, classified through
    /// [`TypeRef::from_name`].
    pub fn typed(name: impl Into<String>, type_name: &str) -> Self {
        Self {
            name: name.into(),
            ty: Some(TypeRef::from_name(type_name)),
        }
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type, if any.
    pub fn ty(&self) -> Option<&TypeRef> {
        self.ty.as_ref()
    }
}

/// A declared method.
pub struct MethodDecl {
    name: String,
    doc: Option<String>,
    is_static: bool,
    params: Vec<ParamDecl>,
    setter: Option<SetterFn>,
}

impl MethodDecl {
    /// Declare a method with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            is_static: false,
            params: Vec::new(),
            setter: None,
        }
    }

    /// Attach the doc comment.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Mark the method static.
    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Append a parameter.
    pub fn with_param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    /// Attach the setter thunk invoked for setter injection.
    pub fn with_setter(
        mut self,
        setter: impl Fn(&Instance, &[Instance]) -> Result<(), ThunkError> + Send + Sync + 'static,
    ) -> Self {
        self.setter = Some(Box::new(setter));
        self
    }

    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Doc comment, if any.
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Whether the method is static.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Declared parameters, in order.
    pub fn params(&self) -> &[ParamDecl] {
        &self.params
    }

    /// The setter thunk, if one was declared.
    pub fn setter(&self) -> Option<&SetterFn> {
        self.setter.as_ref()
    }
}

impl fmt::Debug for MethodDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDecl")
            .field("name", &self.name)
            .field("is_static", &self.is_static)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A declared property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDecl {
    name: String,
    doc: Option<String>,
    is_static: bool,
}

impl PropertyDecl {
    /// Declare a property with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            is_static: false,
        }
    }

    /// Attach the doc comment.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Mark the property static.
    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Doc comment, if any.
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Whether the property is static.
    pub fn is_static(&self) -> bool {
        self.is_static
    }
}

/// A declared constructor: parameters plus the construction thunk.
pub struct ConstructorDecl {
    doc: Option<String>,
    params: Vec<ParamDecl>,
    construct: ConstructFn,
}

impl ConstructorDecl {
    /// Declare a constructor with the given construction thunk.
    pub fn new(
        construct: impl Fn(&[Instance]) -> Result<Instance, ThunkError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            doc: None,
            params: Vec::new(),
            construct: Box::new(construct),
        }
    }

    /// Attach the doc comment.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Append a parameter.
    pub fn with_param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    /// Doc comment, if any.
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Declared parameters, in order.
    pub fn params(&self) -> &[ParamDecl] {
        &self.params
    }

    /// Invoke the construction thunk with resolved dependencies.
    pub fn construct(&self, args: &[Instance]) -> Result<Instance, ThunkError> {
        (self.construct)(args)
    }
}

impl fmt::Debug for ConstructorDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDecl")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Declaration record for one class.
#[derive(Debug)]
pub struct ClassDecl {
    name: String,
    doc: Option<String>,
    parent: Option<String>,
    constructor: Option<ConstructorDecl>,
    methods: Vec<Arc<MethodDecl>>,
    properties: Vec<Arc<PropertyDecl>>,
}

impl ClassDecl {
    /// Declare a class with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            parent: None,
            constructor: None,
            methods: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Attach the doc comment.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Name the parent class. It must be registered as well for inherited
    /// member lookups to see it.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Attach the constructor declaration.
    pub fn with_constructor(mut self, constructor: ConstructorDecl) -> Self {
        self.constructor = Some(constructor);
        self
    }

    /// Append a method declaration.
    pub fn with_method(mut self, method: MethodDecl) -> Self {
        self.methods.push(Arc::new(method));
        self
    }

    /// Append a property declaration.
    pub fn with_property(mut self, property: PropertyDecl) -> Self {
        self.properties.push(Arc::new(property));
        self
    }

    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Doc comment, if any.
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Parent class name, if any.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Constructor declaration, if any.
    pub fn constructor(&self) -> Option<&ConstructorDecl> {
        self.constructor.as_ref()
    }

    /// Methods declared directly on this class.
    pub fn methods(&self) -> &[Arc<MethodDecl>] {
        &self.methods
    }

    /// Properties declared directly on this class.
    pub fn properties(&self) -> &[Arc<PropertyDecl>] {
        &self.properties
    }

    /// A method declared directly on this class.
    pub fn method(&self, name: &str) -> Option<&Arc<MethodDecl>> {
        self.methods.iter().find(|m| m.name() == name)
    }

    /// A property declared directly on this class.
    pub fn property(&self, name: &str) -> Option<&Arc<PropertyDecl>> {
        self.properties.iter().find(|p| p.name() == name)
    }
}

/// Registry of class declarations, the stand-in for native introspection.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: FxHashMap<String, Arc<ClassDecl>>,
}

impl ClassRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class declaration, replacing any previous one of the same
    /// name.
    pub fn register(&mut self, decl: ClassDecl) {
        self.classes.insert(decl.name().to_string(), Arc::new(decl));
    }

    /// Look up a class declaration.
    pub fn get(&self, name: &str) -> Option<Arc<ClassDecl>> {
        self.classes.get(name).cloned()
    }

    /// Whether a class of the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no class is registered.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_decl_lookups() {
        let decl = ClassDecl::new("Queue")
            .with_doc("/** @Singleton */")
            .with_method(MethodDecl::new("push").with_param(ParamDecl::class("item", "Item")))
            .with_property(PropertyDecl::new("capacity").with_static());

        assert_eq!(decl.name(), "Queue");
        assert!(decl.method("push").is_some());
        assert!(decl.method("pop").is_none());
        assert!(decl.property("capacity").unwrap().is_static());
        assert!(decl.property("unknown").is_none());
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut registry = ClassRegistry::new();
        registry.register(ClassDecl::new("Queue"));

        assert!(registry.contains("Queue"));
        assert!(!registry.contains("Stack"));
        assert_eq!(registry.get("Queue").unwrap().name(), "Queue");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_replaces_same_name() {
        let mut registry = ClassRegistry::new();
        registry.register(ClassDecl::new("Queue"));
        registry.register(ClassDecl::new("Queue").with_doc("/** @Singleton */"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Queue").unwrap().doc(), Some("/** @Singleton */"));
    }

    #[test]
    fn test_typed_param_classifies_spelling() {
        assert_eq!(
            ParamDecl::typed("count", "integer").ty(),
            Some(&TypeRef::Primitive(Primitive::Int))
        );
        assert_eq!(
            ParamDecl::typed("engine", "Engine").ty(),
            Some(&TypeRef::Class("Engine".to_string()))
        );
    }

    #[test]
    fn test_constructor_thunk_runs() {
        let ctor = ConstructorDecl::new(|_args| Ok(Arc::new(7u32) as Instance));
        let instance = ctor.construct(&[]).unwrap();
        assert_eq!(instance.downcast_ref::<u32>(), Some(&7));
    }
}
