mod common;

use authgate::auth::{AuthAction, AuthError};
use authgate::session::ConnectionState;
use common::{ip, mac, test_core, track_client};

const ADDR: &str = "10.0.0.5";
const MAC: &str = "aa:bb:cc:dd:ee:ff";

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[test]
fn authenticate_grants_access_and_counts() {
    let core = test_core();
    track_client(&core, ADDR, MAC);

    core.auth
        .apply(ip(ADDR), mac(MAC), AuthAction::Authenticate)
        .unwrap();

    assert_eq!(core.firewall.grants(), 1);
    assert_eq!(core.auth.authenticated_total(), 1);
    let sessions = core.registry.lock();
    assert_eq!(
        sessions.get(ip(ADDR)).unwrap().state,
        ConnectionState::Authenticated
    );
}

#[test]
fn authenticate_is_idempotent() {
    let core = test_core();
    track_client(&core, ADDR, MAC);

    core.auth
        .apply(ip(ADDR), mac(MAC), AuthAction::Authenticate)
        .unwrap();
    core.auth
        .apply(ip(ADDR), mac(MAC), AuthAction::Authenticate)
        .unwrap();

    // Exactly one firewall grant and one counter increment.
    assert_eq!(core.firewall.grants(), 1);
    assert_eq!(core.auth.authenticated_total(), 1);
}

#[test]
fn firewall_happens_before_state_change_on_grant_failure() {
    let core = test_core();
    track_client(&core, ADDR, MAC);
    core.firewall.set_failing(true);

    let err = core
        .auth
        .apply(ip(ADDR), mac(MAC), AuthAction::Authenticate)
        .unwrap_err();
    assert!(matches!(err, AuthError::Firewall(_)));

    // Tracked state stays consistent with enforced state: unauthenticated.
    let state = core.registry.lock().get(ip(ADDR)).unwrap().state;
    assert_eq!(state, ConnectionState::Unknown);
    assert_eq!(core.auth.authenticated_total(), 0);

    // The client can recover once the firewall does.
    core.firewall.set_failing(false);
    core.auth
        .apply(ip(ADDR), mac(MAC), AuthAction::Authenticate)
        .unwrap();
    assert_eq!(core.auth.authenticated_total(), 1);
}

// ---------------------------------------------------------------------------
// Deauthentication
// ---------------------------------------------------------------------------

#[test]
fn deauthenticate_removes_session_and_revokes() {
    let core = test_core();
    track_client(&core, ADDR, MAC);
    core.auth
        .apply(ip(ADDR), mac(MAC), AuthAction::Authenticate)
        .unwrap();

    core.auth
        .apply(ip(ADDR), mac(MAC), AuthAction::Deauthenticate)
        .unwrap();

    assert_eq!(core.firewall.revokes(), 1);
    assert!(core.registry.lock().get(ip(ADDR)).is_none());
}

#[test]
fn deauthenticate_never_authenticated_skips_revoke() {
    let core = test_core();
    track_client(&core, ADDR, MAC);

    core.auth
        .apply(ip(ADDR), mac(MAC), AuthAction::Deauthenticate)
        .unwrap();

    // No firewall call, but the session is still dropped from tracking.
    assert!(core.firewall.calls().is_empty());
    assert!(core.registry.lock().get(ip(ADDR)).is_none());
}

#[test]
fn revoke_failure_retains_session() {
    let core = test_core();
    track_client(&core, ADDR, MAC);
    core.auth
        .apply(ip(ADDR), mac(MAC), AuthAction::Authenticate)
        .unwrap();
    core.firewall.set_failing(true);

    let err = core
        .auth
        .apply(ip(ADDR), mac(MAC), AuthAction::Deauthenticate)
        .unwrap_err();
    assert!(matches!(err, AuthError::Firewall(_)));

    // Session stays tracked and authenticated for a later retry.
    let state = core.registry.lock().get(ip(ADDR)).unwrap().state;
    assert_eq!(state, ConnectionState::Authenticated);

    core.firewall.set_failing(false);
    core.auth
        .apply(ip(ADDR), mac(MAC), AuthAction::Deauthenticate)
        .unwrap();
    assert!(core.registry.lock().get(ip(ADDR)).is_none());
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

#[test]
fn untracked_address_reports_client_not_found() {
    let core = test_core();

    let err = core
        .auth
        .apply(ip(ADDR), mac(MAC), AuthAction::Authenticate)
        .unwrap_err();

    assert!(matches!(err, AuthError::ClientNotFound(a) if a == ip(ADDR)));
    assert!(core.firewall.calls().is_empty());
    assert!(core.registry.lock().get(ip(ADDR)).is_none());
}

#[test]
fn hardware_mismatch_rejects_all_actions() {
    let core = test_core();
    track_client(&core, ADDR, MAC);
    let wrong = mac("11:22:33:44:55:66");

    for action in [AuthAction::Authenticate, AuthAction::Deauthenticate] {
        let err = core.auth.apply(ip(ADDR), wrong, action).unwrap_err();
        assert!(matches!(err, AuthError::IdentityMismatch { .. }));
    }

    // No firewall call, no mutation.
    assert!(core.firewall.calls().is_empty());
    let sessions = core.registry.lock();
    let session = sessions.get(ip(ADDR)).unwrap();
    assert_eq!(session.state, ConnectionState::Unknown);
    assert_eq!(session.hardware_address(), mac(MAC));
}

#[test]
fn unknown_action_rejected_without_side_effects() {
    let core = test_core();
    track_client(&core, ADDR, MAC);

    let err = core
        .auth
        .apply_named(ip(ADDR), mac(MAC), "make-coffee")
        .unwrap_err();

    assert!(matches!(err, AuthError::UnknownAction(ref a) if a == "make-coffee"));
    assert!(core.firewall.calls().is_empty());
    assert!(core.registry.lock().get(ip(ADDR)).is_some());
}

#[test]
fn apply_named_dispatches_known_actions() {
    let core = test_core();
    track_client(&core, ADDR, MAC);

    core.auth
        .apply_named(ip(ADDR), mac(MAC), "authenticate")
        .unwrap();
    assert_eq!(core.auth.authenticated_total(), 1);

    core.auth
        .apply_named(ip(ADDR), mac(MAC), "deauthenticate")
        .unwrap();
    assert!(core.registry.lock().get(ip(ADDR)).is_none());
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_authenticate_and_deauthenticate_serialize() {
    // Both calls must serialize on the registry lock: the end state is the
    // result of exactly one interleaving of the two logical calls, never a
    // half-applied mix.
    for _ in 0..50 {
        let core = std::sync::Arc::new(test_core());
        track_client(&core, ADDR, MAC);

        let a = {
            let core = core.clone();
            std::thread::spawn(move || {
                let _ = core.auth.apply(ip(ADDR), mac(MAC), AuthAction::Authenticate);
            })
        };
        let b = {
            let core = core.clone();
            std::thread::spawn(move || {
                let _ = core
                    .auth
                    .apply(ip(ADDR), mac(MAC), AuthAction::Deauthenticate);
            })
        };
        a.join().unwrap();
        b.join().unwrap();

        let calls = core.firewall.calls();
        let authenticated = core.auth.authenticated_total();

        // Removal is unconditional once deauthenticate finds the session,
        // so every legal interleaving ends with the session gone.
        assert!(
            core.registry.lock().get(ip(ADDR)).is_none(),
            "session survived concurrent authenticate/deauthenticate"
        );

        // Legal interleavings: auth then deauth (grant + revoke), or deauth
        // then auth (no calls at all, auth sees ClientNotFound).
        match calls.len() {
            0 => assert_eq!(authenticated, 0),
            2 => {
                assert_eq!(core.firewall.grants(), 1);
                assert_eq!(core.firewall.revokes(), 1);
                assert_eq!(authenticated, 1);
            }
            n => panic!("unexpected firewall call count {n}: {calls:?}"),
        }
    }
}
