use acme_order::{DiError, RegistrationError, Resolver, ServiceCollection};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_concrete_singleton() {
    let mut sc = ServiceCollection::new();
    sc.add_singleton(42usize);
    sc.add_singleton("hello".to_string());

    let sp = sc.build().unwrap();

    let num1 = sp.get::<usize>().unwrap();
    let num2 = sp.get::<usize>().unwrap();
    let str1 = sp.get::<String>().unwrap();

    assert_eq!(*num1, 42);
    assert_eq!(*str1, "hello");
    assert!(Arc::ptr_eq(&num1, &num2));
}

#[test]
fn test_factory_with_dependencies() {
    struct Config {
        port: u16,
    }

    struct Server {
        config: Arc<Config>,
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton(Config { port: 8080 });
    sc.add_singleton_factory::<Server, _>(|r| Ok(Server { config: r.get::<Config>()? }))
        .requires::<Config>();

    let sp = sc.build().unwrap();
    assert_eq!(sp.get::<Server>().unwrap().config.port, 8080);
}

#[test]
fn test_singletons_are_built_during_build() {
    struct Pool;

    let created = Arc::new(AtomicUsize::new(0));
    let c = created.clone();

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Pool, _>(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(Pool)
    });

    let sp = sc.build().unwrap();
    assert_eq!(created.load(Ordering::SeqCst), 1);

    sp.get::<Pool>().unwrap();
    sp.get::<Pool>().unwrap();
    assert_eq!(created.load(Ordering::SeqCst), 1);
}

#[test]
fn test_trait_singleton() {
    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    struct Fixed;
    impl Clock for Fixed {
        fn now(&self) -> u64 {
            7
        }
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton_trait::<dyn Clock>(Arc::new(Fixed));

    let sp = sc.build().unwrap();
    let a = sp.get_trait::<dyn Clock>().unwrap();
    let b = sp.get_trait::<dyn Clock>().unwrap();
    assert_eq!(a.now(), 7);
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_not_found() {
    let sp = ServiceCollection::new().build().unwrap();
    assert!(matches!(sp.get::<u64>(), Err(DiError::NotFound(_))));
}

#[test]
fn test_undeclared_dependency_fails_construction() {
    struct Needy;

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Needy, _>(|r| {
        r.get::<u64>()?;
        Ok(Needy)
    });

    match sc.build() {
        Err(RegistrationError::Construction { source, .. }) => {
            assert_eq!(source, DiError::NotFound("u64"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("build should fail"),
    }
}

#[test]
fn test_descriptors_list_declared_dependencies() {
    struct Db;
    struct Repo;

    let mut sc = ServiceCollection::new();
    sc.add_singleton(Db);
    sc.add_singleton_factory::<Repo, _>(|_| Ok(Repo)).requires::<Db>();

    let sp = sc.build().unwrap();
    let descriptors = sp.descriptors();
    assert_eq!(descriptors.len(), 2);
    let repo = descriptors.iter().find(|d| d.type_name().ends_with("Repo")).unwrap();
    assert!(repo.dependencies[0].display_name().ends_with("Db"));
    assert!(!repo.is_trait());
}
