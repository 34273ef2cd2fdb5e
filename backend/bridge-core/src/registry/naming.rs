//! Operation name derivation.
//!
//! This file is also compiled into `build.rs` through `#[path]`, so it must
//! stay self-contained: no `crate::` paths and no third-party imports.

/// HTTP methods an operation may declare.
pub const SUPPORTED_METHODS: [&str; 5] = ["get", "post", "put", "patch", "delete"];

/// A method or path segment that cannot produce an operation name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSegment {
    pub segment: String,
    pub reason: &'static str,
}

/// Derive the operation name for `method` + `path`.
///
/// The method is lower-cased and each path segment contributes one PascalCase
/// word; `{param}` segments contribute `By<Param>`. `-`, `_` and `.` start a new
/// word, and a letter following a digit is upper-cased.
///
/// `("post", "/api/v1beta/workloads/{name}/restart")` →
/// `"postApiV1BetaWorkloadsByNameRestart"`.
pub fn derive_operation_name(method: &str, path: &str) -> Result<String, InvalidSegment> {
    let method = method.to_ascii_lowercase();
    if !SUPPORTED_METHODS.contains(&method.as_str()) {
        return Err(InvalidSegment {
            segment: method,
            reason: "unsupported HTTP method",
        });
    }

    if !path.starts_with('/') {
        return Err(InvalidSegment {
            segment: path.to_string(),
            reason: "path must start with '/'",
        });
    }

    let mut name = method;
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        match segment
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
        {
            Some(param) => {
                name.push_str("By");
                push_words(&mut name, param, segment)?;
            }
            None => push_words(&mut name, segment, segment)?,
        }
    }

    Ok(name)
}

/// PascalCase type name for an operation name (`getHealth` → `GetHealth`).
pub fn operation_type_name(operation_name: &str) -> String {
    let mut chars = operation_name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn push_words(name: &mut String, text: &str, segment: &str) -> Result<(), InvalidSegment> {
    let mut capitalize = true;
    let mut previous_digit = false;
    let mut pushed = false;

    for c in text.chars() {
        match c {
            '-' | '_' | '.' => {
                capitalize = true;
                previous_digit = false;
            }
            c if c.is_ascii_alphanumeric() => {
                if capitalize || (previous_digit && c.is_ascii_alphabetic()) {
                    name.push(c.to_ascii_uppercase());
                } else {
                    name.push(c);
                }
                capitalize = false;
                previous_digit = c.is_ascii_digit();
                pushed = true;
            }
            _ => {
                return Err(InvalidSegment {
                    segment: segment.to_string(),
                    reason: "unsupported character in path segment",
                });
            }
        }
    }

    if !pushed {
        return Err(InvalidSegment {
            segment: segment.to_string(),
            reason: "path segment has no identifier characters",
        });
    }

    Ok(())
}
