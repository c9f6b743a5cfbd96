use acme_order::{DiError, RegistrationError, Resolver, ServiceCollection, ServiceModule};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

trait Settings: Send + Sync {}
struct Defaults;
impl Settings for Defaults {}

struct Gate;
struct Store;
struct Service;

#[test]
fn test_missing_trait_dependency_fails_at_build() {
    let constructed = Arc::new(AtomicBool::new(false));
    let c = constructed.clone();

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Service, _>(move |_| {
        c.store(true, Ordering::SeqCst);
        Ok(Service)
    })
    .requires_trait::<dyn Settings>();

    match sc.build() {
        Err(RegistrationError::MissingDependency { service, dependency }) => {
            assert!(service.ends_with("Service"));
            assert!(dependency.contains("Settings"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("missing dependency accepted"),
    }
    assert!(!constructed.load(Ordering::SeqCst), "nothing may be built when validation fails");
}

#[test]
fn test_missing_scoped_dependency_fails_at_build_not_request() {
    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<Gate, _>(|r| {
        r.get_trait::<dyn Settings>()?;
        Ok(Gate)
    })
    .requires_trait::<dyn Settings>();

    assert!(matches!(sc.build(), Err(RegistrationError::MissingDependency { .. })));
}

#[test]
fn test_singleton_capturing_scoped_is_rejected() {
    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<Gate, _>(|_| Ok(Gate));
    sc.add_singleton_factory::<Store, _>(|_| Ok(Store)).requires::<Gate>();

    match sc.build() {
        Err(RegistrationError::CapturedScope { singleton, scoped }) => {
            assert!(singleton.ends_with("Store"));
            assert!(scoped.ends_with("Gate"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("captured scope accepted"),
    }
}

#[test]
fn test_two_node_cycle_reports_path() {
    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Store, _>(|_| Ok(Store)).requires::<Service>();
    sc.add_singleton_factory::<Service, _>(|_| Ok(Service)).requires::<Store>();

    let err = sc.build().err().unwrap();
    let message = err.to_string();
    assert!(message.starts_with("circular dependency: "));
    assert!(message.contains("Store"));
    assert!(message.contains("Service"));
}

#[test]
fn test_duplicate_trait_contract_is_rejected() {
    let mut sc = ServiceCollection::new();
    sc.add_singleton_trait::<dyn Settings>(Arc::new(Defaults));
    sc.add_singleton_trait::<dyn Settings>(Arc::new(Defaults));

    assert!(matches!(sc.build(), Err(RegistrationError::Duplicate { .. })));
}

#[test]
fn test_module_graph_validates() {
    struct SettingsModule;
    impl ServiceModule for SettingsModule {
        fn register_services(self, services: &mut ServiceCollection) {
            services.add_singleton_trait::<dyn Settings>(Arc::new(Defaults));
        }
    }

    struct GateModule;
    impl ServiceModule for GateModule {
        fn register_services(self, services: &mut ServiceCollection) {
            services
                .add_scoped_factory::<Gate, _>(|r| {
                    r.get_trait::<dyn Settings>()?;
                    Ok(Gate)
                })
                .requires_trait::<dyn Settings>();
        }
    }

    let mut sc = ServiceCollection::new();
    sc.add_module(SettingsModule).add_module(GateModule);
    let sp = sc.build().unwrap();
    assert!(sp.create_scope().get::<Gate>().is_ok());
}

#[test]
fn test_undeclared_self_resolution_fails_at_build() {
    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Store, _>(|r| {
        r.get::<Store>()?;
        Ok(Store)
    });

    match sc.build() {
        Err(RegistrationError::Construction { service, source: DiError::Circular(path) }) => {
            assert!(service.ends_with("Store"));
            assert_eq!(path.len(), 2);
            assert!(path.iter().all(|name| name.ends_with("Store")));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("self-resolving singleton accepted"),
    }
}

#[test]
fn test_undeclared_two_node_cycle_fails_at_build() {
    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Store, _>(|r| {
        r.get::<Service>()?;
        Ok(Store)
    });
    sc.add_singleton_factory::<Service, _>(|r| {
        r.get::<Store>()?;
        Ok(Service)
    });

    let err = sc.build().err().unwrap();
    assert!(matches!(
        err,
        RegistrationError::Construction { source: DiError::Circular(ref path), .. } if path.len() == 3
    ));
}

#[test]
fn test_undeclared_scoped_self_resolution_is_an_error() {
    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<Gate, _>(|r| {
        r.get::<Gate>()?;
        Ok(Gate)
    });
    let sp = sc.build().unwrap();
    let scope = sp.create_scope();

    assert!(matches!(scope.get::<Gate>(), Err(DiError::Circular(_))));
    assert!(matches!(scope.get::<Gate>(), Err(DiError::Circular(_))), "a failed attempt leaves no residue");
}
