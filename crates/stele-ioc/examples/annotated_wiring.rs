//! Wiring a small object graph from annotated declarations.
//!
//! Run with: `cargo run --example annotated_wiring -p stele-ioc`

use std::sync::Arc;

use parking_lot::Mutex;

use stele_ioc::Binder;
use stele_reflect::reflect::decl::{
    ClassDecl, ClassRegistry, ConstructorDecl, MethodDecl, ParamDecl,
};
use stele_reflect::{Instance, Reflector, ThunkError};

struct Mailer;

impl Mailer {
    fn deliver(&self, recipient: &str) {
        println!("delivering to {recipient}");
    }
}

struct Newsletter {
    mailer: Arc<Mailer>,
    sender: Mutex<Option<Arc<String>>>,
}

fn main() {
    let mut registry = ClassRegistry::new();

    registry.register(
        ClassDecl::new("Mailer")
            .with_doc("/**\n * smtp delivery\n *\n * @Singleton\n */")
            .with_constructor(ConstructorDecl::new(|_| Ok(Arc::new(Mailer) as Instance))),
    );

    registry.register(
        ClassDecl::new("Newsletter")
            .with_constructor(
                ConstructorDecl::new(|args| {
                    let mailer = args[0]
                        .clone()
                        .downcast::<Mailer>()
                        .map_err(|_| ThunkError::new("mailer expected"))?;
                    Ok(Arc::new(Newsletter {
                        mailer,
                        sender: Mutex::new(None),
                    }) as Instance)
                })
                .with_doc("/**\n * @Inject\n */")
                .with_param(ParamDecl::class("mailer", "Mailer")),
            )
            .with_method(
                MethodDecl::new("set_sender")
                    .with_doc("/**\n * @Inject\n * @Named('sender')\n */")
                    .with_param(ParamDecl::untyped("sender"))
                    .with_setter(|instance, args| {
                        let newsletter = instance
                            .downcast_ref::<Newsletter>()
                            .ok_or_else(|| ThunkError::new("newsletter expected"))?;
                        let sender = args[0]
                            .clone()
                            .downcast::<String>()
                            .map_err(|_| ThunkError::new("string expected"))?;
                        *newsletter.sender.lock() = Some(sender);
                        Ok(())
                    }),
            ),
    );

    let mut binder = Binder::new();
    binder.bind("Mailer");
    binder.bind("Newsletter");
    binder
        .bind_constant("sender")
        .to_value("news@example.org".to_string());

    let injector = binder.build(Reflector::new(registry));

    let newsletter = injector
        .instance_as::<Newsletter>("Newsletter")
        .expect("newsletter resolves");
    let sender = newsletter.sender.lock().clone().expect("sender injected");
    println!("sending as {sender}");
    newsletter.mailer.deliver("subscribers");

    // the @Singleton annotation on Mailer makes both resolutions share one
    // instance
    let a = injector.instance("Mailer").expect("mailer resolves");
    let b = injector.instance("Mailer").expect("mailer resolves");
    assert!(Arc::ptr_eq(&a, &b));
}
