//! Unit tests for endpoint name validation.

use zxtouch_ipc::models::endpoint::EndpointName;
use zxtouch_ipc::AppError;

#[test]
fn accepts_reverse_dns_name() {
    let name = EndpointName::new("com.zjx.zxtouchd.springboard").expect("valid name");
    assert_eq!(name.as_str(), "com.zjx.zxtouchd.springboard");
    assert_eq!(name.to_string(), "com.zjx.zxtouchd.springboard");
}

#[test]
fn rejects_empty_name() {
    let err = EndpointName::new("").unwrap_err();
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
}

#[test]
fn rejects_nul_byte() {
    let err = EndpointName::new("bad\0name").unwrap_err();
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
}

#[test]
fn name_is_opaque() {
    // No structure is imposed beyond the OS constraints.
    assert!(EndpointName::new("N").is_ok());
    assert!(EndpointName::new("not a dns name at all!").is_ok());
}
