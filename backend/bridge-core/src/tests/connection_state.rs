use crate::transport::connection_state::ConnectionState;

use std::sync::Arc;

#[test]
fn given_matching_token_when_validated_then_authenticated() {
    // GIVEN
    let mut state = ConnectionState::new(Arc::from("secret"));
    assert!(!state.is_authenticated());

    // WHEN
    let valid = state.validate_token("secret");

    // THEN
    assert!(valid);
    assert!(state.is_authenticated());
}

#[test]
fn given_wrong_or_empty_token_when_validated_then_not_authenticated() {
    let mut state = ConnectionState::new(Arc::from("secret"));

    assert!(!state.validate_token("Secret"));
    assert!(!state.validate_token(""));
    assert!(!state.is_authenticated());
}

#[test]
fn given_empty_expected_token_when_validating_empty_then_rejected() {
    let mut state = ConnectionState::new(Arc::from(""));

    assert!(!state.validate_token(""));
}
