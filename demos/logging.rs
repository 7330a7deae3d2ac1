//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use autowire_di::{ClassCatalog, ClassDescriptor, Container, Definition, Overrides, Parameter};
use std::sync::Arc;

#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct UserService {
    db: Arc<Database>,
    page_size: u32,
}

fn catalog() -> ClassCatalog {
    let catalog = ClassCatalog::new();
    catalog.register(ClassDescriptor::with_constructor(
        "App::Database",
        vec![Parameter::untyped("url")],
        |args| Ok(Database { url: args.next_cloned()? }),
    ));
    catalog.register(ClassDescriptor::with_constructor(
        "App::UserService",
        vec![
            Parameter::typed("db", "App::Database"),
            Parameter::untyped("page_size").with_default(20u32),
        ],
        |args| {
            Ok(UserService {
                db: args.next()?,
                page_size: args.next_cloned()?,
            })
        },
    ));
    catalog
}

fn main() {
    // JSON if logging-json is enabled, pretty otherwise. Only container
    // events, including every discovery step.
    autowire_di::logging::builder()
        .trace()
        .container_only()
        .init();

    println!("=== autowire-di Logging Demo ===\n");

    // Logs: "Creating container"
    let container = Container::builder()
        .prefix("", "app.")
        .reflector(catalog())
        .build();

    // Logs: "Registering service"
    container.set(
        "app.database.url",
        Definition::value(String::from("postgres://localhost/mydb")),
    );

    // Logs the candidates tried, the discovered classes and their parameters
    let users = container.get_as::<UserService>("user_service").unwrap();
    println!("  [App] page size {}", users.page_size);

    // Logs: "Service not found", then the recorded misses
    assert!(container.get("mailer").is_err());

    // Logs: "Alias installed", "Following alias"
    container.alias("users", "app.user_service");
    let _users = container.get("users").unwrap();

    // Logs: "Applying decorator"
    container.extend("app.database.url", |url: Arc<String>, _: &Container| {
        format!("{url}?sslmode=require")
    });
    let _url = container.get("app.database.url").unwrap();

    // A fresh instance with one parameter replaced
    let _custom = container
        .get_modified("user_service", &Overrides::new().with("page_size", 50u32))
        .unwrap();

    println!("\n=== Demo Complete ===");
    println!("\nTip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (colorful output)");
}
