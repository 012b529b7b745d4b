use crate::HttpStatusCode;

/// **VALUE**: Verifies that 401 and 403 are the only codes classified as auth rejection.
///
/// **WHY THIS MATTERS**: Auth rejection sends the user back to pairing, while every
/// other failure is "wait and retry". Misclassifying a 404 or 500 as a rejection would
/// make users throw away a perfectly good pairing.
///
/// **BUG THIS CATCHES**: Would catch if the range check is widened to all 4xx.
#[test]
fn given_status_codes_when_checking_auth_rejection_then_only_401_and_403_match() {
    // GIVEN: A spread of status codes
    let rejected = [401, 403];
    let not_rejected = [200, 400, 404, 429, 500, 503];

    // WHEN/THEN: Only 401/403 are auth rejections
    for code in rejected {
        assert!(HttpStatusCode(code).is_auth_rejection(), "{code} should be rejection");
    }
    for code in not_rejected {
        assert!(
            !HttpStatusCode(code).is_auth_rejection(),
            "{code} should not be rejection"
        );
    }
}

/// **VALUE**: Verifies retryable classification covers the transient server codes.
///
/// **BUG THIS CATCHES**: Would catch if 403 ever becomes retryable, which would
/// hammer a sensor that has revoked us.
#[test]
fn given_transient_codes_when_checking_retryable_then_true() {
    // GIVEN/WHEN/THEN
    assert!(HttpStatusCode(503).is_retryable());
    assert!(HttpStatusCode(429).is_retryable());
    assert!(!HttpStatusCode(403).is_retryable());
    assert!(HttpStatusCode(502).is_server_error());
    assert!(HttpStatusCode(404).is_client_error());
}
