//! Example demonstrating the #[derive(Autowire)] macro
//!
//! Run with:
//!   cargo run --example derive --features derive

use autowire_di::{Autowire, Container, Definition, Factory, Overrides};
use std::sync::Arc;

#[allow(dead_code)]
#[derive(Autowire)]
#[autowire(namespace = "App")]
struct Database {
    url: String,
}

#[derive(Autowire)]
#[autowire(namespace = "App")]
struct Cache {
    #[autowire(default = 1024)]
    size: usize,
}

#[derive(Autowire)]
#[autowire(namespace = "App")]
struct UserService {
    db: Arc<Database>,
    cache: Arc<Cache>,
    // Not a constructor parameter, uses Default
    #[autowire(skip)]
    request_count: u64,
}

impl UserService {
    fn describe(&self) -> String {
        format!(
            "UserService connected to {} with cache size {} (requests: {})",
            self.db.url, self.cache.size, self.request_count
        )
    }
}

fn main() {
    println!("=== autowire-di Derive Macro Demo ===\n");

    let container = Container::builder()
        .class::<Database>()
        .class::<Cache>()
        .class::<UserService>()
        .build();

    // `url` has no class and no default: it comes from `app.database.url`
    container.set(
        "app.database.url",
        Definition::value(String::from("postgres://localhost:5432/myapp")),
    );

    println!("Resolving app.user_service...");
    let users = container.get_as::<UserService>("app.user_service").unwrap();
    println!("  {}", users.describe());
    println!("  registered: {:?}", container.keys());
    println!();

    println!("Building caches from app.cache.factory...");
    let factory = container.get_as::<Factory>("app.cache.factory").unwrap();
    let small = factory
        .new_instance_with_as::<Cache>(&Overrides::new().with("size", 16usize))
        .unwrap();
    let default = factory.new_instance_as::<Cache>().unwrap();
    println!("  sizes {} and {}", small.size, default.size);
    println!();

    println!("=== Demo Complete ===");
    println!("\nThe #[derive(Autowire)] macro generated a class descriptor that:");
    println!("  - Declares Arc<T> fields as parameters of class T::CLASS");
    println!("  - Takes other fields by value from `{{service}}.{{field}}` entries or defaults");
    println!("  - Uses Default::default() for #[autowire(skip)] fields");
}
