use crate::base::neterror::NetError;

#[test]
fn test_net_error_roundtrip() {
    let original = NetError::NameNotResolved;
    let code = original.as_i32();
    assert_eq!(code, -105);
    let converted = NetError::from(code);
    assert!(matches!(converted, NetError::NameNotResolved));

    let shutdown = NetError::ContextShutDown;
    assert_eq!(shutdown.as_i32(), -26);
    assert!(matches!(NetError::from(-26), NetError::ContextShutDown));
}

#[test]
fn test_unknown_error() {
    let err = NetError::from(-9999);
    assert!(matches!(err, NetError::Unknown(-9999)));
    assert_eq!(err.as_i32(), -9999);
}

#[test]
fn test_name_not_found_classification() {
    assert!(NetError::NameNotResolved.is_name_not_found());
    assert!(NetError::NameResolutionFailed.is_name_not_found());

    // Transient conditions are not treated as a missing name
    assert!(!NetError::DnsTimedOut.is_name_not_found());
    assert!(!NetError::Aborted.is_name_not_found());
}

#[test]
fn test_unproduced_codes_are_unknown() {
    // -106 is ERR_INTERNET_DISCONNECTED, which no resolver here reports.
    assert_eq!(NetError::from(-106), NetError::Unknown(-106));
    assert_eq!(NetError::from(-106).as_i32(), -106);
}
