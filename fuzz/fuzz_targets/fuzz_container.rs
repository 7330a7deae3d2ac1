#![no_main]

//! Fuzz target for basic container operations
//!
//! Mixes registration, aliases, decorators and resolution over a small pool
//! of identifiers, some of which name discoverable classes.

use arbitrary::Arbitrary;
use autowire_di::{ClassCatalog, ClassDescriptor, Container, Definition, Overrides, Parameter};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

const IDS: [&str; 6] = [
    "fuzz.leaf",
    "fuzz.node",
    "fuzz.node.leaf",
    "fuzz.node.factory",
    "leaf",
    "unknown",
];

#[derive(Debug, Arbitrary)]
enum ContainerOp {
    SetValue(u8, u32),
    SetShared(u8, u32),
    Unset(u8),
    Alias(u8, u8),
    Extend(u8),
    Has(u8),
    Get(u8),
    GetModified(u8, u32),
    Keys,
}

struct Leaf(u32);

#[allow(dead_code)]
struct Node {
    leaf: Arc<Leaf>,
    weight: u32,
}

fn id(index: u8) -> &'static str {
    IDS[index as usize % IDS.len()]
}

fn catalog() -> ClassCatalog {
    let catalog = ClassCatalog::new();
    catalog.register(ClassDescriptor::without_constructor("Fuzz::Leaf", || Leaf(0)));
    catalog.register(ClassDescriptor::with_constructor(
        "Fuzz::Node",
        vec![
            Parameter::typed("leaf", "Fuzz::Leaf"),
            Parameter::untyped("weight").with_default(1u32),
        ],
        |args| {
            Ok(Node {
                leaf: args.next()?,
                weight: args.next_cloned()?,
            })
        },
    ));
    catalog
}

fuzz_target!(|ops: Vec<ContainerOp>| {
    let container = Container::builder()
        .prefix("", "fuzz.")
        .reflector(catalog())
        .build();

    for op in ops {
        match op {
            ContainerOp::SetValue(i, value) => {
                container.set(id(i), Definition::value(value));
                assert!(container.is_defined(id(i)));
            }
            ContainerOp::SetShared(i, value) => {
                container.set(id(i), Definition::shared(move |_: &Container| value));
            }
            ContainerOp::Unset(i) => {
                container.unset(id(i));
                assert!(!container.is_defined(id(i)));
            }
            ContainerOp::Alias(from, to) => {
                container.alias(id(from), id(to));
            }
            ContainerOp::Extend(i) => {
                container.extend(id(i), |n: Arc<u32>, _: &Container| n.wrapping_add(1));
            }
            ContainerOp::Has(i) => {
                // Alias loops and type mismatches surface as errors, never panics
                let _ = container.has(id(i));
            }
            ContainerOp::Get(i) => {
                let _ = container.get(id(i));
            }
            ContainerOp::GetModified(i, weight) => {
                let _ = container.get_modified(id(i), &Overrides::new().with("weight", weight));
            }
            ContainerOp::Keys => {
                assert_eq!(container.keys().len(), container.len());
            }
        }
    }
});
