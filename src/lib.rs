//! # autowire-di - String-keyed DI with constructor auto-wiring
//!
//! A dependency injection container addressed by dotted identifiers
//! (`app.mailer.transport`) that can build services nobody registered: an
//! unknown identifier is turned into a class name, the class's constructor
//! is inspected and every parameter is resolved recursively.
//!
//! ## Features
//!
//! - **Auto-wiring** - classes described by a [`ClassDescriptor`] (or
//!   `#[derive(Autowire)]`) are discovered and registered on first use
//! - **Prefix maps** - rewrite rules between external and internal namespaces
//! - **Aliases** - identifiers redirecting to other identifiers
//! - **Decorator chains** - `extend` wraps a service, applied in registration order
//! - **Factories** - fresh instances per call, with per-call parameter overrides
//! - **Negative cache** - remembered misses, optionally persisted to disk
//! - **Observable** - optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use autowire_di::{ClassCatalog, ClassDescriptor, Container, Definition, Parameter};
//! use std::sync::Arc;
//!
//! struct Transport {
//!     host: String,
//! }
//!
//! struct Mailer {
//!     transport: Arc<Transport>,
//! }
//!
//! let catalog = ClassCatalog::new();
//! catalog.register(ClassDescriptor::with_constructor(
//!     "App::Transport",
//!     vec![Parameter::untyped("host")],
//!     |args| Ok(Transport { host: args.next_cloned()? }),
//! ));
//! catalog.register(ClassDescriptor::with_constructor(
//!     "App::Mailer",
//!     vec![Parameter::typed("transport", "App::Transport")],
//!     |args| Ok(Mailer { transport: args.next()? }),
//! ));
//!
//! let container = Container::builder().reflector(catalog).build();
//!
//! // `{service}.{parameter}` entries feed untyped parameters
//! container.set("app.transport.host", Definition::value(String::from("smtp.local")));
//!
//! let mailer = container.get_as::<Mailer>("app.mailer").unwrap();
//! assert_eq!(mailer.transport.host, "smtp.local");
//!
//! // Discovered services are shared
//! let again = container.get_as::<Mailer>("app.mailer").unwrap();
//! assert!(Arc::ptr_eq(&mailer, &again));
//! ```
//!
//! ## Prefixes and Decorators
//!
//! ```rust
//! use autowire_di::{Container, Definition};
//! use std::sync::Arc;
//!
//! let container = Container::builder().prefix("", "vendor.").build();
//! container.set("vendor.greeting", Definition::value(String::from("hello")));
//!
//! container.extend("greeting", |s: Arc<String>, _: &Container| format!("{s} world"));
//! container.extend("greeting", |s: Arc<String>, _: &Container| format!("{s}!"));
//!
//! assert_eq!(container.get_as::<String>("greeting").unwrap().as_str(), "hello world!");
//! ```

extern crate self as autowire_di;

mod alias;
mod autowire;
mod config;
mod container;
mod error;
mod extension;
mod factory;
#[cfg(feature = "logging")]
pub mod logging;
mod negative_cache;
mod normalize;
mod prefix;
mod provider;
mod reflect;
mod storage;

pub use autowire::Overrides;
pub use config::*;
pub use container::*;
pub use error::*;
pub use extension::{DecoratorFn, Extension};
pub use factory::{Callable, Definition, Factory, FactoryFn};
pub use negative_cache::NegativeCache;
pub use normalize::*;
pub use prefix::*;
pub use provider::*;
pub use reflect::*;

#[cfg(feature = "derive")]
pub use autowire_di_derive::Autowire;

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Autowire, ClassCatalog, ClassDescriptor, Container, ContainerBuilder, DefaultPolicy,
        Definition, DiError, Factory, Injectable, Overrides, Parameter, Result,
    };
    pub use std::sync::Arc;
}
