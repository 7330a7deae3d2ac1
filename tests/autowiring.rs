//! Discovery through the public API with hand-written descriptors

use autowire_di::{
    ClassCatalog, ClassDescriptor, Container, ContainerBuilder, ContainerConfig, Definition,
    NegativeCacheConfig, Overrides, Parameter, Reflector,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use tempfile::TempDir;

struct Connection {
    dsn: String,
}

struct Repository {
    connection: Arc<Connection>,
    table: String,
}

fn catalog() -> ClassCatalog {
    let catalog = ClassCatalog::new();
    catalog.register(ClassDescriptor::with_constructor(
        "Acme::Db::Connection",
        vec![Parameter::untyped("dsn")],
        |args| {
            Ok(Connection {
                dsn: args.next_cloned()?,
            })
        },
    ));
    catalog.register(ClassDescriptor::with_constructor(
        "Acme::Db::Repository",
        vec![
            Parameter::typed("connection", "Acme::Db::Connection"),
            Parameter::untyped("table").with_default(String::from("items")),
        ],
        |args| {
            Ok(Repository {
                connection: args.next()?,
                table: args.next_cloned()?,
            })
        },
    ));
    catalog
}

/// Requests use `db.`, classes live under `acme.db.`
fn container() -> Container {
    let container = ContainerBuilder::new()
        .prefix("db.", "acme.db.")
        .reflector(catalog())
        .build();
    container.set(
        "acme.db.connection.dsn",
        Definition::value(String::from("sqlite://memory")),
    );
    container
}

#[test]
fn test_external_prefix_resolves_internal_class() {
    let container = container();
    let repository = container.get_as::<Repository>("db.repository").unwrap();

    assert_eq!(repository.connection.dsn, "sqlite://memory");
    assert_eq!(repository.table, "items");
    assert!(container.is_defined("acme.db.repository"));
    assert!(container.is_defined("acme.db.connection"));
}

#[test]
fn test_get_modified_overrides_one_parameter() {
    let container = container();
    let repository = container
        .get_modified_as::<Repository>("db.repository", &Overrides::new().with("table", String::from("archive")))
        .unwrap();

    assert_eq!(repository.table, "archive");
    // The other parameter is still auto-wired and shared
    let connection = container.get_as::<Connection>("acme.db.connection").unwrap();
    assert!(Arc::ptr_eq(&connection, &repository.connection));

    let shared = container.get_as::<Repository>("db.repository").unwrap();
    assert_eq!(shared.table, "items");
}

#[test]
fn test_config_file_with_persisted_negative_cache() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("cache").join("misses.json");
    let config_path = dir.path().join("container.json");
    std::fs::write(
        &config_path,
        format!(
            r#"{{
                "prefixes": [{{"external": "db.", "internal": "acme.db."}}],
                "negative_cache": {{"path": {:?}, "persist_probability": 1.0}}
            }}"#,
            cache_path.display().to_string()
        ),
    )
    .unwrap();

    let config = ContainerConfig::from_file(&config_path).unwrap();
    assert_eq!(
        config.negative_cache,
        Some(NegativeCacheConfig::new(&cache_path).with_probability(1.0))
    );

    let first = ContainerBuilder::from_config(config.clone())
        .reflector(catalog())
        .build();
    assert!(first.get("db.missing").unwrap_err().is_not_found());
    assert!(cache_path.exists());

    let second = ContainerBuilder::from_config(config)
        .reflector(catalog())
        .build();
    assert!(second.negative_cache().is_miss("Acme::Db::Missing"));
    assert!(second.negative_cache().is_miss("Db::Missing"));

    // A recorded miss never hides an explicit registration
    second.set("db.missing", Definition::value(7u8));
    assert_eq!(*second.get_as::<u8>("db.missing").unwrap(), 7);
}

#[test]
fn test_negative_cache_skips_reflection() {
    static REFLECTED: AtomicU32 = AtomicU32::new(0);

    struct Counting;
    impl Reflector for Counting {
        fn reflect(&self, _: &str) -> Option<Arc<ClassDescriptor>> {
            REFLECTED.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    let container = Container::builder().reflector(Counting).build();
    assert!(!container.has("nowhere").unwrap());
    let after_first = REFLECTED.load(Ordering::SeqCst);
    assert!(after_first > 0);

    assert!(!container.has("nowhere").unwrap());
    assert_eq!(REFLECTED.load(Ordering::SeqCst), after_first);
}

#[test]
fn test_resolving_from_threads() {
    let container = container();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let container = container.clone();
            thread::spawn(move || container.get_as::<Connection>("acme.db.connection").unwrap())
        })
        .collect();

    let connections: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = &connections[0];
    assert_eq!(first.dsn, "sqlite://memory");
    for connection in &connections[1..] {
        assert!(Arc::ptr_eq(first, connection));
    }
    let stored = container.get_as::<Connection>("acme.db.connection").unwrap();
    assert!(Arc::ptr_eq(first, &stored));
}
