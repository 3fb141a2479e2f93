use cairn_cloud::CloudError;

#[test]
fn auth_required_display() {
    assert_eq!(
        CloudError::AuthRequired.to_string(),
        "bearer token missing or empty"
    );
}

#[test]
fn rejected_display() {
    let err = CloudError::Rejected {
        status: 422,
        message: "unknown column".into(),
    };
    assert_eq!(
        err.to_string(),
        "server rejected request (422): unknown column"
    );
}

#[test]
fn server_error_display() {
    let err = CloudError::ServerError {
        status: 503,
        message: "overloaded".into(),
    };
    assert_eq!(err.to_string(), "server error (503): overloaded");
}

#[test]
fn timeout_display() {
    assert_eq!(CloudError::Timeout.to_string(), "push deadline exceeded");
}

#[test]
fn config_display() {
    let err = CloudError::Config("tenant_id is empty".into());
    assert_eq!(err.to_string(), "invalid configuration: tenant_id is empty");
}

#[test]
fn four_xx_is_not_retryable() {
    let err = CloudError::Rejected {
        status: 400,
        message: String::new(),
    };
    assert!(!err.is_retryable());
}

#[test]
fn five_xx_is_retryable() {
    let err = CloudError::ServerError {
        status: 500,
        message: String::new(),
    };
    assert!(err.is_retryable());
}

#[test]
fn timeout_is_retryable() {
    assert!(CloudError::Timeout.is_retryable());
}

#[test]
fn read_failure_is_retryable() {
    assert!(CloudError::Read("database locked".into()).is_retryable());
}

#[test]
fn auth_and_config_are_not_retryable() {
    assert!(!CloudError::AuthRequired.is_retryable());
    assert!(!CloudError::Config("x".into()).is_retryable());
}

#[test]
fn from_serde_json_error() {
    let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
    let err: CloudError = json_err.into();
    assert!(err.to_string().contains("serialization error"));
    assert!(!err.is_retryable());
}
