use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

#[path = "src/registry/naming.rs"]
mod naming;

const OPERATIONS_TOML: &str = "operations.toml";
const OPERATIONS_GENERATED_FILE: &str = "operations.rs";

fn main() {
    // Read the interface description
    let config_path = PathBuf::from(OPERATIONS_TOML);
    let config_content = fs::read_to_string(&config_path)
        .unwrap_or_else(|e| panic!("Failed to read {OPERATIONS_TOML}: {e}"));

    let config: OperationsFile = toml::from_str(&config_content)
        .unwrap_or_else(|e| panic!("Failed to parse {OPERATIONS_TOML}: {e}"));

    // Derive names and reject collisions
    let operations = resolve_operations(&config.operations);

    // Generate Rust code
    let code = generate_rust_code(&operations);

    // Write to OUT_DIR
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let dest_path = out_dir.join(OPERATIONS_GENERATED_FILE);
    fs::write(&dest_path, code)
        .unwrap_or_else(|e| panic!("Failed to write {OPERATIONS_GENERATED_FILE}: {e}"));

    // Rebuild if the description or the naming rules change
    println!("cargo:rerun-if-changed={OPERATIONS_TOML}");
    println!("cargo:rerun-if-changed=src/registry/naming.rs");
}

#[derive(serde::Deserialize)]
struct OperationsFile {
    operations: Vec<OperationEntry>,
}

#[derive(serde::Deserialize)]
struct OperationEntry {
    method: String,
    path: String,
    request: String,
    response: String,
    #[serde(default)]
    summary: Option<String>,
}

struct ResolvedOperation<'a> {
    name: String,
    type_name: String,
    method_variant: &'static str,
    entry: &'a OperationEntry,
}

/// Derive every operation name; any malformed entry or collision fails the build.
fn resolve_operations(entries: &[OperationEntry]) -> Vec<ResolvedOperation<'_>> {
    if entries.is_empty() {
        panic!("{OPERATIONS_TOML} declares no operations");
    }

    let mut seen: HashMap<String, String> = HashMap::with_capacity(entries.len());
    let mut resolved = Vec::with_capacity(entries.len());

    for entry in entries {
        let name = naming::derive_operation_name(&entry.method, &entry.path).unwrap_or_else(|e| {
            panic!(
                "Malformed operation {} {}: '{}' ({})",
                entry.method, entry.path, e.segment, e.reason
            )
        });

        let identity = format!("{} {}", entry.method.to_ascii_uppercase(), entry.path);
        if let Some(existing) = seen.insert(name.clone(), identity.clone()) {
            panic!("Duplicate operation name '{name}': declared by '{existing}' and '{identity}'");
        }

        resolved.push(ResolvedOperation {
            type_name: naming::operation_type_name(&name),
            method_variant: method_variant(&entry.method),
            name,
            entry,
        });
    }

    resolved
}

fn method_variant(method: &str) -> &'static str {
    match method.to_ascii_lowercase().as_str() {
        "get" => "Get",
        "post" => "Post",
        "put" => "Put",
        "patch" => "Patch",
        "delete" => "Delete",
        other => panic!("Unsupported HTTP method '{other}'"),
    }
}

/// Generate one typed operation per entry plus the descriptor table.
fn generate_rust_code(operations: &[ResolvedOperation<'_>]) -> String {
    let mut code = String::new();

    // Header
    code.push_str("// Generated by build.rs - DO NOT EDIT\n");
    code.push_str("// Source: operations.toml\n\n");

    for operation in operations {
        let entry = operation.entry;
        let method_upper = entry.method.to_ascii_uppercase();

        match &entry.summary {
            Some(summary) => code.push_str(&format!(
                "/// `{method_upper} {}`: {summary}\n",
                entry.path
            )),
            None => code.push_str(&format!("/// `{method_upper} {}`\n", entry.path)),
        }
        code.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq)]\n");
        code.push_str(&format!("pub struct {};\n\n", operation.type_name));

        code.push_str(&format!("impl Operation for {} {{\n", operation.type_name));
        code.push_str(&format!(
            "    const NAME: &'static str = \"{}\";\n",
            operation.name
        ));
        code.push_str(&format!(
            "    const METHOD: HttpMethod = HttpMethod::{};\n",
            operation.method_variant
        ));
        code.push_str(&format!(
            "    const PATH: &'static str = \"{}\";\n",
            entry.path
        ));
        code.push_str(&format!("    type Request = {};\n", entry.request));
        code.push_str(&format!("    type Response = {};\n", entry.response));
        code.push_str("}\n\n");
    }

    // Descriptor table in declaration order
    code.push_str("/// Number of generated operations.\n");
    code.push_str(&format!(
        "pub const OPERATION_COUNT: usize = {};\n\n",
        operations.len()
    ));
    code.push_str("/// Every generated operation, in declaration order.\n");
    code.push_str("pub static DESCRIPTORS: [OperationDescriptor; OPERATION_COUNT] = [\n");
    for operation in operations {
        code.push_str(&format!(
            "    OperationDescriptor::new(\"{}\", HttpMethod::{}, \"{}\"),\n",
            operation.name, operation.method_variant, operation.entry.path
        ));
    }
    code.push_str("];\n");

    code
}
