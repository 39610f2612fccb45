//! End-to-end tests for annotation queries through the reflection wrappers

use stele_reflect::reflect::decl::{ClassDecl, ClassRegistry, MethodDecl, PropertyDecl};
use stele_reflect::reflect::{Annotatable, Reflector};
use stele_reflect::{AnnotationCache, AnnotationError, AnnotationFactory, AnnotationValue};

fn registry() -> ClassRegistry {
    let mut registry = ClassRegistry::new();

    registry.register(
        ClassDecl::new("Repository")
            .with_doc("/**\n * base storage access\n */")
            .with_method(
                MethodDecl::new("find")
                    .with_doc("/**\n * looks an entity up\n *\n * @Transactional\n */"),
            )
            .with_method(MethodDecl::new("store")),
    );

    registry.register(
        ClassDecl::new("AuditedRepository")
            .with_doc("/**\n * storage access with an audit trail\n *\n * @Singleton\n */")
            .with_parent("Repository")
            .with_method(
                MethodDecl::new("store").with_doc(
                    "/**\n * stores and records the change\n *\n * @Audit('change')\n * @Tag('fast')\n * @Tag('safe')\n */",
                ),
            )
            .with_property(
                PropertyDecl::new("trail").with_doc("/**\n * @Inject\n */"),
            )
            .with_property(
                PropertyDecl::new("instances")
                    .with_static()
                    .with_doc("/**\n * @Counted\n */"),
            ),
    );

    registry
}

#[test]
fn class_annotation_lookup() {
    let reflector = Reflector::new(registry());
    let class = reflector.class("AuditedRepository").unwrap();

    assert!(class.has_annotation("Singleton"));
    assert!(!class.has_annotation("Transactional"));

    let annotation = class.annotation("Singleton").unwrap();
    assert_eq!(annotation.name(), "Singleton");
    assert_eq!(annotation.target(), "AuditedRepository");
}

#[test]
fn missing_annotation_fails_with_not_found() {
    let reflector = Reflector::new(registry());
    let class = reflector.class("Repository").unwrap();

    assert!(matches!(
        class.annotation("Singleton"),
        Err(AnnotationError::NotFound { .. })
    ));
    // and repeatably so, answered from the negative cache
    assert!(matches!(
        class.annotation("Singleton"),
        Err(AnnotationError::NotFound { .. })
    ));
    assert_eq!(reflector.parse_count(), 1);
}

#[test]
fn method_annotations_use_method_target() {
    let reflector = Reflector::new(registry());
    let method = reflector
        .class("AuditedRepository")
        .unwrap()
        .method("store")
        .unwrap();

    let annotation = method.annotation("Audit").unwrap();
    assert_eq!(annotation.target(), "AuditedRepository::store()");
    assert_eq!(annotation.value(), Some(&AnnotationValue::Str("change".into())));
}

#[test]
fn duplicate_annotations_are_listed_in_encounter_order() {
    let reflector = Reflector::new(registry());
    let method = reflector
        .class("AuditedRepository")
        .unwrap()
        .method("store")
        .unwrap();

    let all = method.annotations();
    let tags: Vec<_> = all.named("Tag").collect();
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].value(), Some(&AnnotationValue::Str("fast".into())));
    assert_eq!(tags[1].value(), Some(&AnnotationValue::Str("safe".into())));

    // the single lookup consistently picks the last occurrence
    let tag = method.annotation("Tag").unwrap();
    assert_eq!(tag.value(), Some(&AnnotationValue::Str("safe".into())));
    assert_eq!(method.annotation("Tag").unwrap(), tag);
}

#[test]
fn inherited_method_reports_superclass_as_declaring_class() {
    let reflector = Reflector::new(registry());
    let class = reflector.class("AuditedRepository").unwrap();

    // inherited and not overridden: declared by the superclass
    let find = class.method("find").unwrap();
    assert_eq!(find.declaring_class().name(), "Repository");

    // overridden in the subclass: declared by the subclass itself
    let store = class.method("store").unwrap();
    assert_eq!(store.declaring_class().name(), "AuditedRepository");

    // the inherited method still carries the superclass annotations
    assert!(find.has_annotation("Transactional"));
}

#[test]
fn declaring_class_reuses_originating_wrapper() {
    let reflector = Reflector::new(registry());
    let class = reflector.class("AuditedRepository").unwrap();
    let store = class.method("store").unwrap();

    assert_eq!(store.declaring_class(), class);
}

#[test]
fn property_targets_distinguish_static_and_instance() {
    let reflector = Reflector::new(registry());
    let class = reflector.class("AuditedRepository").unwrap();

    let trail = class.property("trail").unwrap();
    assert_eq!(trail.target(), "AuditedRepository->trail");
    assert!(trail.has_annotation("Inject"));

    let instances = class.property("instances").unwrap();
    assert_eq!(instances.target(), "AuditedRepository::$instances");
    assert!(instances.has_annotation("Counted"));
}

#[test]
fn reflected_members_compare_by_class_and_name() {
    let reflector = Reflector::new(registry());
    let class = reflector.class("AuditedRepository").unwrap();
    let base = reflector.class("Repository").unwrap();

    let store_a = class.method("store").unwrap();
    let store_b = class.method("store").unwrap();
    assert_eq!(store_a, store_b);

    // same method name through a different class is a different member
    let store_base = base.method("store").unwrap();
    assert_ne!(store_a, store_base);

    assert_ne!(class.method("find").unwrap(), store_a);
}

#[test]
fn display_renders_kind_and_target() {
    let reflector = Reflector::new(registry());
    let class = reflector.class("AuditedRepository").unwrap();

    assert_eq!(class.to_string(), "ReflectionClass[AuditedRepository]");
    assert_eq!(
        class.method("store").unwrap().to_string(),
        "ReflectionMethod[AuditedRepository::store()]"
    );
    assert_eq!(
        class.property("trail").unwrap().to_string(),
        "ReflectionProperty[AuditedRepository->trail]"
    );
}

#[test]
fn methods_include_inherited_ones_with_overrides_shadowed() {
    let reflector = Reflector::new(registry());
    let class = reflector.class("AuditedRepository").unwrap();

    let methods = class.methods();
    let names: Vec<_> = methods.iter().map(|m| m.name().to_string()).collect();
    assert_eq!(names, vec!["store", "find"]);

    // the override, not the inherited declaration
    let store = methods.iter().find(|m| m.name() == "store").unwrap();
    assert_eq!(store.declaring_class().name(), "AuditedRepository");
}

#[test]
fn persisted_cache_survives_a_new_reflector() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("annotations.cache");

    {
        let mut cache = AnnotationCache::new();
        cache.persist_in_file(&path);
        let reflector = Reflector::with_factory(registry(), AnnotationFactory::with_cache(cache));
        let class = reflector.class("AuditedRepository").unwrap();
        assert!(class.has_annotation("Singleton"));
        assert_eq!(reflector.parse_count(), 1);
    }

    let mut cache = AnnotationCache::new();
    cache.persist_in_file(&path);
    let reflector = Reflector::with_factory(registry(), AnnotationFactory::with_cache(cache));
    let class = reflector.class("AuditedRepository").unwrap();

    // answered from the hydrated cache without parsing anything
    assert!(class.has_annotation("Singleton"));
    assert_eq!(reflector.parse_count(), 0);
}

#[test]
fn stop_clears_shared_state() {
    let reflector = Reflector::new(registry());
    let class = reflector.class("AuditedRepository").unwrap();
    assert!(class.has_annotation("Singleton"));
    assert_eq!(reflector.parse_count(), 1);

    reflector.stop();
    assert_eq!(reflector.parse_count(), 0);
    assert!(class.has_annotation("Singleton"));
    assert_eq!(reflector.parse_count(), 1);
}
