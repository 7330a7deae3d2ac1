//! Conversion between service identifiers and class names
//!
//! Service ids live in a dotted, lower-case namespace
//! (`auto_wire.fixture_classes.simple_service`), class names in a
//! `::`-separated camel-case one (`AutoWire::FixtureClasses::SimpleService`).
//! The two functions here are inverses for every id made of
//! `[-]?word(_word)*` segments.
//!
//! | id fragment | class fragment |
//! |-------------|----------------|
//! | `.`         | `::`           |
//! | `_x`        | `X`            |
//! | `__x`       | `_X`           |
//! | `.-x`       | `::x`          |

/// Namespace separator used in class names
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Convert a service id into a class-name candidate.
///
/// # Examples
///
/// ```rust
/// use autowire_di::to_class_form;
///
/// assert_eq!(
///     to_class_form("auto_wire.fixture_classes.simple_service"),
///     "AutoWire::FixtureClasses::SimpleService"
/// );
/// assert_eq!(to_class_form("vendor.-lowercase"), "Vendor::lowercase");
/// ```
pub fn to_class_form(id: &str) -> String {
    let mut out = String::with_capacity(id.len() + 8);
    let mut chars = id.chars().peekable();
    let mut capitalize = true;

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                out.push_str(NAMESPACE_SEPARATOR);
                capitalize = true;
            }
            '_' if chars.peek() == Some(&'_') => {
                chars.next();
                out.push('_');
                capitalize = true;
            }
            '_' => capitalize = true,
            '-' => capitalize = false,
            _ if capitalize => {
                out.push(c.to_ascii_uppercase());
                capitalize = false;
            }
            _ => out.push(c),
        }
    }

    out
}

/// Convert a class name into a service-id candidate.
///
/// # Examples
///
/// ```rust
/// use autowire_di::to_id_form;
///
/// assert_eq!(
///     to_id_form("AutoWire::FixtureClasses::SimpleService"),
///     "auto_wire.fixture_classes.simple_service"
/// );
/// assert_eq!(to_id_form("Vendor::lowercase"), "vendor.-lowercase");
/// ```
pub fn to_id_form(class_name: &str) -> String {
    let mut out = String::with_capacity(class_name.len() + 8);

    for (segment_index, segment) in class_name.split(NAMESPACE_SEPARATOR).enumerate() {
        if segment_index > 0 {
            out.push('.');
        }
        for (i, c) in segment.chars().enumerate() {
            if c.is_ascii_uppercase() {
                if i > 0 {
                    out.push('_');
                }
                out.push(c.to_ascii_lowercase());
            } else if i == 0 && segment_index > 0 && c.is_ascii_lowercase() {
                out.push('-');
                out.push(c);
            } else {
                out.push(c.to_ascii_lowercase());
            }
        }
    }

    out
}

/// Normalize a constructor parameter name into the key used for overrides
/// and `"{service_id}.{key}"` lookups.
///
/// `otherValue` and `other_value` both become `other_value`.
pub fn param_key(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => {
            let mut capitalized = String::with_capacity(name.len());
            capitalized.push(first.to_ascii_uppercase());
            capitalized.push_str(chars.as_str());
            to_id_form(&capitalized)
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEGMENTS: &[&str] = &[
        "a",
        "foo",
        "x1",
        "bar_baz",
        "v2_api_client",
        "simple_service_without_dependencies",
        "-lower",
        "-lower_case",
    ];

    fn ids(depth: usize) -> Vec<String> {
        let mut out: Vec<String> = SEGMENTS
            .iter()
            .filter(|s| !s.starts_with('-'))
            .map(|s| s.to_string())
            .collect();
        let mut frontier = out.clone();
        for _ in 1..depth {
            let mut next = Vec::new();
            for prefix in &frontier {
                for segment in SEGMENTS {
                    next.push(format!("{prefix}.{segment}"));
                }
            }
            out.extend(next.iter().cloned());
            frontier = next;
        }
        out
    }

    #[test]
    fn test_class_form_examples() {
        assert_eq!(
            to_class_form("auto_wire.fixture_classes.service_with_dependencies"),
            "AutoWire::FixtureClasses::ServiceWithDependencies"
        );
        assert_eq!(to_class_form("foo"), "Foo");
        assert_eq!(to_class_form("foo.-bar"), "Foo::bar");
        assert_eq!(to_class_form("__private"), "_Private");
        assert_eq!(to_class_form("foo__bar"), "Foo_Bar");
        assert_eq!(to_class_form(""), "");
    }

    #[test]
    fn test_id_form_examples() {
        assert_eq!(
            to_id_form("AutoWire::FixtureClasses::ServiceWithDependencies"),
            "auto_wire.fixture_classes.service_with_dependencies"
        );
        assert_eq!(to_id_form("Foo::bar"), "foo.-bar");
        assert_eq!(to_id_form("_Private"), "__private");
        assert_eq!(to_id_form("lower"), "lower");
        assert_eq!(to_id_form("HTTPClient"), "h_t_t_p_client");
    }

    #[test]
    fn test_round_trip_all_ids() {
        let all = ids(3);
        assert!(all.len() > 300);
        for id in all {
            assert_eq!(to_id_form(&to_class_form(&id)), id, "round trip of {id}");
        }
    }

    #[test]
    fn test_round_trip_class_names() {
        for class in [
            "Foo",
            "Foo::Bar",
            "AutoWire::FixtureClasses::SimpleServiceWithoutDependencies",
            "Vendor::lowercase::Thing",
            "Foo_Bar",
        ] {
            assert_eq!(to_class_form(&to_id_form(class)), class);
        }
    }

    #[test]
    fn test_param_key() {
        assert_eq!(param_key("value"), "value");
        assert_eq!(param_key("otherValue"), "other_value");
        assert_eq!(param_key("other_value"), "other_value");
        assert_eq!(param_key(""), "");
    }
}
