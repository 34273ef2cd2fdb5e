use crate::error::registry::RegistryError;
use crate::registry::operations::{
    DESCRIPTORS, DeleteApiV1BetaGroupsByName, GetApiV1BetaWorkloads, OPERATION_COUNT,
    PostApiV1BetaWorkloadsByNameRestart,
};
use crate::registry::{
    HttpMethod, Operation, OperationDescriptor, OperationRegistry, OperationSpec,
};

/// **VALUE**: The generated registry contains every entry of `operations.toml`, once.
///
/// **WHY THIS MATTERS**: Both sides of the bridge enumerate this table at startup.
/// If `builtin()` drops or merges entries, an operation silently disappears from
/// the proxy and the dispatch bridge at the same time, which no completeness check
/// can notice.
///
/// **BUG THIS CATCHES**: Would catch a descriptor table that diverges from the
/// generated typed operations.
#[test]
fn given_builtin_registry_when_enumerated_then_matches_generated_descriptors() {
    // GIVEN: The build-time registry
    let registry = OperationRegistry::builtin();

    // WHEN / THEN: Every generated descriptor is present and nothing else
    assert_eq!(registry.len(), OPERATION_COUNT);
    assert_eq!(DESCRIPTORS.len(), OPERATION_COUNT);
    for descriptor in DESCRIPTORS.iter() {
        assert_eq!(registry.get(&descriptor.name), Some(descriptor));
    }
}

#[test]
fn given_typed_operation_when_looked_up_then_descriptor_matches_constants() {
    let registry = OperationRegistry::builtin();

    let restart = registry
        .get(PostApiV1BetaWorkloadsByNameRestart::NAME)
        .expect("restart is registered");

    assert_eq!(restart.name, "postApiV1BetaWorkloadsByNameRestart");
    assert_eq!(restart.method, HttpMethod::Post);
    assert_eq!(restart.path, "/api/v1beta/workloads/{name}/restart");
    assert_eq!(
        OperationDescriptor::of::<PostApiV1BetaWorkloadsByNameRestart>(),
        *restart
    );
}

#[test]
fn given_builtin_registry_then_contains_studio_operations() {
    let registry = OperationRegistry::builtin();

    for name in [
        "getHealth",
        "getApiV1BetaVersion",
        "getApiV1BetaGroups",
        "postApiV1BetaGroups",
        GetApiV1BetaWorkloads::NAME,
        DeleteApiV1BetaGroupsByName::NAME,
        "getApiV1BetaSecretsDefaultKeys",
        "getApiV1BetaDiscoveryClients",
    ] {
        assert!(registry.contains(name), "Missing {name}");
    }
    assert!(!registry.contains("getApiV1BetaUnknown"));
}

#[test]
fn given_builtin_registry_when_listing_names_then_sorted() {
    let names: Vec<&str> = OperationRegistry::builtin().names().collect();

    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
}

/// **VALUE**: Runtime generation rejects two identities that derive the same name.
///
/// **WHY THIS MATTERS**: Name bijectivity is what makes name-based forwarding safe.
/// A collision must fail when the registry is produced, never at call time.
///
/// **BUG THIS CATCHES**: Would catch a registry that keeps the last entry on
/// collision, silently routing one operation's calls to another.
#[test]
fn given_colliding_identities_when_generating_then_duplicate_error() {
    // GIVEN: Two paths that differ only by a separator
    let specs = [
        OperationSpec::new("get", "/api/v1beta/client-status"),
        OperationSpec::new("get", "/api/v1beta/client_status"),
    ];

    // WHEN
    let result = OperationRegistry::generate(&specs);

    // THEN
    assert!(matches!(result, Err(RegistryError::Duplicate { .. })));
}

#[test]
fn given_malformed_identity_when_generating_then_malformed_error() {
    let specs = [OperationSpec::new("get", "/api/v1beta/{}")];

    let result = OperationRegistry::generate(&specs);

    assert!(matches!(result, Err(RegistryError::Malformed { .. })));
}

#[test]
fn given_distinct_identities_when_generating_then_every_name_registered() {
    // GIVEN: Same path, different methods
    let specs = [
        OperationSpec::new("GET", "/api/v1beta/groups"),
        OperationSpec::new("post", "/api/v1beta/groups"),
    ];

    // WHEN
    let registry = OperationRegistry::generate(&specs).expect("no collisions");

    // THEN
    assert_eq!(registry.len(), 2);
    assert_eq!(
        registry.get("getApiV1BetaGroups").map(|d| d.method),
        Some(HttpMethod::Get)
    );
    assert_eq!(
        registry.get("postApiV1BetaGroups").map(|d| d.method),
        Some(HttpMethod::Post)
    );
}

#[test]
fn given_empty_specs_when_generating_then_empty_registry() {
    let registry = OperationRegistry::generate(&[]).expect("empty is valid");

    assert!(registry.is_empty());
    assert_eq!(registry.iter().count(), 0);
}
