// Unit tests for operation name derivation.
// The same rules run inside build.rs, so a regression here is a build-time one too.

use crate::registry::naming::{derive_operation_name, operation_type_name};

/// **VALUE**: Verifies the derivation rule on a path with a parameter and a trailing action.
///
/// **WHY THIS MATTERS**: Operation names are the only key shared by the proxy, the
/// dispatch bridge and the mock engine. If the rule drifts, every side still agrees
/// with itself but tests written against documented names stop resolving.
///
/// **BUG THIS CATCHES**: Would catch if `{param}` stops producing `By<Param>`, or if
/// the digit→letter capitalization in `v1beta` is lost.
#[test]
fn given_restart_path_when_deriving_name_then_matches_documented_name() {
    // GIVEN: The restart workload operation
    let method = "POST";
    let path = "/api/v1beta/workloads/{name}/restart";

    // WHEN: Deriving its name
    let name = derive_operation_name(method, path).expect("valid operation");

    // THEN: Method is lower-cased and each segment is one PascalCase word
    assert_eq!(name, "postApiV1BetaWorkloadsByNameRestart");
}

#[test]
fn given_separators_when_deriving_name_then_each_starts_a_word() {
    // GIVEN: Segments with '-', '_' and '.'
    let path = "/discovery/client-status/by_group/v2.json";

    // WHEN
    let name = derive_operation_name("get", path).expect("valid operation");

    // THEN
    assert_eq!(name, "getDiscoveryClientStatusByGroupV2Json");
}

#[test]
fn given_root_level_path_when_deriving_name_then_single_word() {
    assert_eq!(
        derive_operation_name("get", "/health").expect("valid operation"),
        "getHealth"
    );
}

#[test]
fn given_same_identity_when_deriving_twice_then_names_are_identical() {
    // GIVEN / WHEN: The same declared identity derived twice
    let first = derive_operation_name("delete", "/api/v1beta/groups/{name}");
    let second = derive_operation_name("delete", "/api/v1beta/groups/{name}");

    // THEN: Deterministic
    assert_eq!(first, second);
    assert_eq!(first.as_deref(), Ok("deleteApiV1BetaGroupsByName"));
}

/// **VALUE**: Malformed identities are rejected instead of producing a lossy name.
///
/// **BUG THIS CATCHES**: Would catch if unsupported characters were silently dropped,
/// which lets `/a b` and `/ab` collide without any error.
#[test]
fn given_malformed_identities_when_deriving_name_then_fails() {
    let cases = [
        ("get", "api/no-leading-slash"),
        ("get", "/api/with space"),
        ("get", "/api/{}"),
        ("get", "/api/---"),
        ("trace", "/api/groups"),
        ("get", "/api/q?x=1"),
    ];

    for (method, path) in cases {
        assert!(
            derive_operation_name(method, path).is_err(),
            "Should reject {method} {path}"
        );
    }
}

#[test]
fn given_invalid_character_when_deriving_name_then_reports_segment() {
    let error = derive_operation_name("get", "/api/bad$segment").unwrap_err();

    assert_eq!(error.segment, "bad$segment");
}

#[test]
fn given_operation_name_when_type_name_then_first_letter_upper_cased() {
    assert_eq!(
        operation_type_name("getApiV1BetaGroups"),
        "GetApiV1BetaGroups"
    );
    assert_eq!(operation_type_name(""), "");
}
