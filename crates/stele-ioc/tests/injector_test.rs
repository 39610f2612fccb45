//! End-to-end tests for binding resolution through the injector

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use stele_ioc::{
    boxed_provider, Binder, BindingError, BindingModule, Injector, InjectionProvider,
    SingletonScope, ValueProvider,
};
use stele_reflect::reflect::decl::{
    ClassDecl, ClassRegistry, ConstructorDecl, MethodDecl, ParamDecl,
};
use stele_reflect::{Instance, Reflector, ThunkError};

// ============================================================================
// Fixture classes
// ============================================================================

struct Engine {
    cylinders: u32,
}

struct Radio;

struct Car {
    engine: Arc<Engine>,
    radio: Mutex<Option<Arc<Radio>>>,
}

struct Convoy {
    lead: Mutex<Option<Arc<Engine>>>,
    rear: Mutex<Option<Arc<Engine>>>,
}

struct Connection;

struct Scratch;

struct Question {
    answer: Mutex<Option<i64>>,
}

/// Provider built by the `EngineProvider` class.
struct BuiltEngineProvider;

impl InjectionProvider for BuiltEngineProvider {
    fn get(&self, _injector: &Injector, _name: Option<&str>) -> Result<Instance, BindingError> {
        Ok(Arc::new(Engine { cylinders: 12 }))
    }
}

/// Provider handing out a fresh engine per call, counting up.
struct SequenceProvider {
    counter: AtomicU32,
}

impl SequenceProvider {
    fn new() -> Self {
        Self {
            counter: AtomicU32::new(0),
        }
    }
}

impl InjectionProvider for SequenceProvider {
    fn get(&self, _injector: &Injector, _name: Option<&str>) -> Result<Instance, BindingError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Engine { cylinders: n }))
    }
}

fn engine_decl(name: &str, cylinders: u32) -> ClassDecl {
    ClassDecl::new(name)
        .with_constructor(ConstructorDecl::new(move |_| {
            Ok(Arc::new(Engine { cylinders }) as Instance)
        }))
}

fn registry() -> ClassRegistry {
    let mut registry = ClassRegistry::new();

    registry.register(engine_decl("Engine", 6));
    registry.register(engine_decl("StrongEngine", 8));
    registry.register(engine_decl("WeakEngine", 4));

    registry.register(
        ClassDecl::new("Radio")
            .with_constructor(ConstructorDecl::new(|_| Ok(Arc::new(Radio) as Instance))),
    );

    registry.register(
        ClassDecl::new("Connection")
            .with_doc("/**\n * pooled database access\n *\n * @Singleton\n */")
            .with_constructor(ConstructorDecl::new(|_| Ok(Arc::new(Connection) as Instance))),
    );

    registry.register(
        ClassDecl::new("Scratch")
            .with_constructor(ConstructorDecl::new(|_| Ok(Arc::new(Scratch) as Instance))),
    );

    registry.register(
        ClassDecl::new("Car")
            .with_constructor(
                ConstructorDecl::new(|args| {
                    let engine = args[0]
                        .clone()
                        .downcast::<Engine>()
                        .map_err(|_| ThunkError::new("engine expected"))?;
                    Ok(Arc::new(Car {
                        engine,
                        radio: Mutex::new(None),
                    }) as Instance)
                })
                .with_doc("/**\n * @Inject\n */")
                .with_param(ParamDecl::class("engine", "Engine")),
            )
            .with_method(
                MethodDecl::new("set_radio")
                    .with_doc("/**\n * @Inject(optional=true)\n */")
                    .with_param(ParamDecl::class("radio", "Radio"))
                    .with_setter(|instance, args| {
                        let car = instance
                            .downcast_ref::<Car>()
                            .ok_or_else(|| ThunkError::new("car expected"))?;
                        let radio = args[0]
                            .clone()
                            .downcast::<Radio>()
                            .map_err(|_| ThunkError::new("radio expected"))?;
                        *car.radio.lock() = Some(radio);
                        Ok(())
                    }),
            ),
    );

    registry.register(
        ClassDecl::new("Convoy")
            .with_constructor(ConstructorDecl::new(|_| {
                Ok(Arc::new(Convoy {
                    lead: Mutex::new(None),
                    rear: Mutex::new(None),
                }) as Instance)
            }))
            .with_method(
                MethodDecl::new("set_engines")
                    .with_doc("/**\n * @Inject\n * @Named(lead='strong', rear='weak')\n */")
                    .with_param(ParamDecl::class("lead", "Engine"))
                    .with_param(ParamDecl::class("rear", "Engine"))
                    .with_setter(|instance, args| {
                        let convoy = instance
                            .downcast_ref::<Convoy>()
                            .ok_or_else(|| ThunkError::new("convoy expected"))?;
                        let lead = args[0]
                            .clone()
                            .downcast::<Engine>()
                            .map_err(|_| ThunkError::new("engine expected"))?;
                        let rear = args[1]
                            .clone()
                            .downcast::<Engine>()
                            .map_err(|_| ThunkError::new("engine expected"))?;
                        *convoy.lead.lock() = Some(lead);
                        *convoy.rear.lock() = Some(rear);
                        Ok(())
                    }),
            ),
    );

    registry.register(
        ClassDecl::new("Question")
            .with_constructor(ConstructorDecl::new(|_| {
                Ok(Arc::new(Question {
                    answer: Mutex::new(None),
                }) as Instance)
            }))
            .with_method(
                MethodDecl::new("set_answer")
                    .with_doc("/**\n * @Inject\n * @Named('answer')\n */")
                    .with_param(ParamDecl::untyped("answer"))
                    .with_setter(|instance, args| {
                        let question = instance
                            .downcast_ref::<Question>()
                            .ok_or_else(|| ThunkError::new("question expected"))?;
                        let answer = args[0]
                            .clone()
                            .downcast::<i64>()
                            .map_err(|_| ThunkError::new("integer expected"))?;
                        *question.answer.lock() = Some(*answer);
                        Ok(())
                    }),
            ),
    );

    registry.register(
        ClassDecl::new("EngineProvider")
            .with_constructor(ConstructorDecl::new(|_| Ok(boxed_provider(BuiltEngineProvider)))),
    );

    registry.register(
        ClassDecl::new("Junk")
            .with_constructor(ConstructorDecl::new(|_| Ok(Arc::new(5u8) as Instance))),
    );

    registry.register(
        ClassDecl::new("ServiceA")
            .with_constructor(
                ConstructorDecl::new(|args| Ok(args[0].clone()))
                    .with_doc("/**\n * @Inject\n */")
                    .with_param(ParamDecl::class("b", "ServiceB")),
            ),
    );
    registry.register(
        ClassDecl::new("ServiceB")
            .with_constructor(
                ConstructorDecl::new(|args| Ok(args[0].clone()))
                    .with_doc("/**\n * @Inject\n */")
                    .with_param(ParamDecl::class("a", "ServiceA")),
            ),
    );

    registry.register(ClassDecl::new("NoCtor"));

    registry
}

fn reflector() -> Reflector {
    Reflector::new(registry())
}

// ============================================================================
// Resolution strategies
// ============================================================================

#[test]
fn binds_type_to_itself_by_default() {
    let mut binder = Binder::new();
    binder.bind("Engine");
    let injector = binder.build(reflector());

    let engine = injector.instance_as::<Engine>("Engine").unwrap();
    assert_eq!(engine.cylinders, 6);
}

#[test]
fn binds_type_to_implementation_class() {
    let mut binder = Binder::new();
    binder.bind("Engine").to("StrongEngine");
    let injector = binder.build(reflector());

    let engine = injector.instance_as::<Engine>("Engine").unwrap();
    assert_eq!(engine.cylinders, 8);
}

#[test]
fn bound_instance_takes_priority() {
    let mut binder = Binder::new();
    binder
        .bind("Engine")
        .to("StrongEngine")
        .to_instance(Engine { cylinders: 99 });
    let injector = binder.build(reflector());

    let engine = injector.instance_as::<Engine>("Engine").unwrap();
    assert_eq!(engine.cylinders, 99);

    // the same instance every time, no scope involved
    let again = injector.instance("Engine").unwrap();
    let first = injector.instance("Engine").unwrap();
    assert!(Arc::ptr_eq(&first, &again));
}

#[test]
fn provider_instance_is_consulted_per_resolution() {
    let mut binder = Binder::new();
    binder.bind("Engine").to_provider(SequenceProvider::new());
    let injector = binder.build(reflector());

    let first = injector.instance_as::<Engine>("Engine").unwrap();
    let second = injector.instance_as::<Engine>("Engine").unwrap();
    assert_eq!(first.cylinders, 0);
    assert_eq!(second.cylinders, 1);
}

#[test]
fn provider_class_is_instantiated_through_the_injector() {
    let mut binder = Binder::new();
    binder.bind("EngineProvider");
    binder.bind("Engine").to_provider_class("EngineProvider");
    let injector = binder.build(reflector());

    let engine = injector.instance_as::<Engine>("Engine").unwrap();
    assert_eq!(engine.cylinders, 12);
}

#[test]
fn provider_class_without_capability_is_rejected() {
    let mut binder = Binder::new();
    binder.bind("Junk");
    binder.bind("Engine").to_provider_class("Junk");
    let injector = binder.build(reflector());

    match injector.instance("Engine") {
        Err(BindingError::NotAProvider { class, ty }) => {
            assert_eq!(class, "Junk");
            assert_eq!(ty, "Engine");
        }
        other => panic!("expected NotAProvider, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn unknown_binding_fails() {
    let binder = Binder::new();
    let injector = binder.build(reflector());

    match injector.instance("Engine") {
        Err(BindingError::UnknownBinding { key }) => assert_eq!(key, "Engine"),
        other => panic!("expected UnknownBinding, got {:?}", other.map(|_| ())),
    }
    assert!(!injector.has_binding("Engine"));
}

#[test]
fn named_bindings_use_composite_keys() {
    let mut binder = Binder::new();
    binder.bind("Engine").named("strong").to("StrongEngine");
    binder.bind("Engine").named("weak").to("WeakEngine");
    let injector = binder.build(reflector());

    assert!(injector.has_named_binding("Engine", "strong"));
    assert!(!injector.has_binding("Engine"));

    let strong = injector.named_instance("Engine", Some("strong")).unwrap();
    let Ok(strong) = strong.downcast::<Engine>() else {
        panic!("expected an Engine");
    };
    assert_eq!(strong.cylinders, 8);

    assert!(matches!(
        injector.instance("Engine"),
        Err(BindingError::UnknownBinding { .. })
    ));
}

#[test]
fn later_binding_for_same_key_wins() {
    let mut binder = Binder::new();
    binder.bind("Engine").to("WeakEngine");
    binder.bind("Engine").to("StrongEngine");
    let injector = binder.build(reflector());

    let engine = injector.instance_as::<Engine>("Engine").unwrap();
    assert_eq!(engine.cylinders, 8);
}

// ============================================================================
// Scopes
// ============================================================================

#[test]
fn singleton_annotation_applies_scope_automatically() {
    let mut binder = Binder::new();
    binder.bind("Connection");
    let injector = binder.build(reflector());

    let first = injector.instance("Connection").unwrap();
    let second = injector.instance("Connection").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn unannotated_binding_is_transient() {
    let mut binder = Binder::new();
    binder.bind("Scratch");
    let injector = binder.build(reflector());

    let first = injector.instance("Scratch").unwrap();
    let second = injector.instance("Scratch").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn explicit_singleton_scope_without_annotation() {
    let mut binder = Binder::new();
    binder.bind("Scratch").as_singleton();
    let injector = binder.build(reflector());

    let first = injector.instance("Scratch").unwrap();
    let second = injector.instance("Scratch").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn session_binding_without_installed_scope_fails() {
    let mut binder = Binder::new();
    binder.bind("Scratch").in_session();
    let injector = binder.build(reflector());

    assert!(matches!(
        injector.instance("Scratch"),
        Err(BindingError::NoSessionScope)
    ));
}

#[test]
fn session_binding_delegates_to_installed_scope() {
    let mut binder = Binder::new();
    binder.set_session_scope(Arc::new(SingletonScope::new()));
    binder.bind("Scratch").in_session();
    let injector = binder.build(reflector());

    let first = injector.instance("Scratch").unwrap();
    let second = injector.instance("Scratch").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

// ============================================================================
// Constructor and setter injection
// ============================================================================

#[test]
fn constructor_injection_resolves_annotated_params() {
    let mut binder = Binder::new();
    binder.bind("Engine");
    binder.bind("Car");
    let injector = binder.build(reflector());

    let car = injector.instance_as::<Car>("Car").unwrap();
    assert_eq!(car.engine.cylinders, 6);
}

#[test]
fn missing_required_dependency_names_the_injection_point() {
    let mut binder = Binder::new();
    binder.bind("Car");
    let injector = binder.build(reflector());

    match injector.instance("Car") {
        Err(BindingError::UnresolvedDependency { target, param, .. }) => {
            assert_eq!(target, "Car::new()");
            assert_eq!(param, "engine");
        }
        other => panic!("expected UnresolvedDependency, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn optional_setter_injection_is_skipped_when_unbound() {
    let mut binder = Binder::new();
    binder.bind("Engine");
    binder.bind("Car");
    let injector = binder.build(reflector());

    let car = injector.instance_as::<Car>("Car").unwrap();
    assert!(car.radio.lock().is_none());
}

#[test]
fn optional_setter_injection_applies_when_bound() {
    let mut binder = Binder::new();
    binder.bind("Engine");
    binder.bind("Radio");
    binder.bind("Car");
    let injector = binder.build(reflector());

    let car = injector.instance_as::<Car>("Car").unwrap();
    assert!(car.radio.lock().is_some());
}

#[test]
fn named_hints_qualify_individual_params() {
    let mut binder = Binder::new();
    binder.bind("Engine").named("strong").to("StrongEngine");
    binder.bind("Engine").named("weak").to("WeakEngine");
    binder.bind("Convoy");
    let injector = binder.build(reflector());

    let convoy = injector.instance_as::<Convoy>("Convoy").unwrap();
    assert_eq!(convoy.lead.lock().as_ref().unwrap().cylinders, 8);
    assert_eq!(convoy.rear.lock().as_ref().unwrap().cylinders, 4);
}

#[test]
fn class_without_constructor_cannot_be_constructed() {
    let mut binder = Binder::new();
    binder.bind("NoCtor");
    let injector = binder.build(reflector());

    assert!(matches!(
        injector.instance("NoCtor"),
        Err(BindingError::NoConstructor { .. })
    ));
}

// ============================================================================
// Cycle detection
// ============================================================================

/// Strip the per-param context wrappers down to the root cause.
fn root_cause(err: BindingError) -> BindingError {
    match err {
        BindingError::UnresolvedDependency { source, .. } => root_cause(*source),
        other => other,
    }
}

#[test]
fn circular_dependency_fails_fast() {
    let mut binder = Binder::new();
    binder.bind("ServiceA");
    binder.bind("ServiceB");
    let injector = binder.build(reflector());

    let Some(err) = injector.instance("ServiceA").err() else {
        panic!("expected resolution to fail");
    };
    match root_cause(err) {
        BindingError::CircularDependency { chain } => {
            assert_eq!(chain, ["ServiceA", "ServiceB", "ServiceA"]);
        }
        other => panic!("expected CircularDependency, got {other:?}"),
    }
}

#[test]
fn cycle_failure_leaves_the_injector_usable() {
    let mut binder = Binder::new();
    binder.bind("ServiceA");
    binder.bind("ServiceB");
    binder.bind("Engine");
    let injector = binder.build(reflector());

    assert!(injector.instance("ServiceA").is_err());
    // the resolution chain unwound; unrelated lookups still work
    assert!(injector.instance("Engine").is_ok());
}

// ============================================================================
// Constants
// ============================================================================

#[test]
fn constant_binding_round_trips() {
    let mut binder = Binder::new();
    binder.bind_constant("answer").to_value(42i64);
    let injector = binder.build(reflector());

    assert!(injector.has_constant("answer"));
    assert_eq!(*injector.constant_as::<i64>("answer").unwrap(), 42);
}

#[test]
fn unknown_constant_fails() {
    let binder = Binder::new();
    let injector = binder.build(reflector());

    assert!(!injector.has_constant("answer"));
    assert!(matches!(
        injector.constant("answer"),
        Err(BindingError::UnknownConstant { .. })
    ));
}

#[test]
fn constant_via_provider() {
    let mut binder = Binder::new();
    binder
        .bind_constant("answer")
        .to_provider(ValueProvider::new(42i64));
    let injector = binder.build(reflector());

    assert_eq!(*injector.constant_as::<i64>("answer").unwrap(), 42);
}

#[test]
fn constant_injected_into_untyped_setter_param() {
    let mut binder = Binder::new();
    binder.bind_constant("answer").to_value(42i64);
    binder.bind("Question");
    let injector = binder.build(reflector());

    let question = injector.instance_as::<Question>("Question").unwrap();
    assert_eq!(*question.answer.lock(), Some(42));
}

// ============================================================================
// Modules
// ============================================================================

struct DriveModule;

impl BindingModule for DriveModule {
    fn configure(&self, binder: &mut Binder) {
        binder.bind("Engine");
        binder.bind("Car");
    }
}

#[test]
fn binder_built_from_modules() {
    let binder = Binder::from_modules(&[&DriveModule]);
    let injector = binder.build(reflector());

    let car = injector.instance_as::<Car>("Car").unwrap();
    assert_eq!(car.engine.cylinders, 6);
}
