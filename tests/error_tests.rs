//! Tests for the error system.

use tessera::capability::QualifiedName;
use tessera::error::*;

#[test]
fn error_helper_mappings_are_stable_for_major_variants() {
    struct Case {
        error: TesseraError,
        expected_category: ErrorCategory,
        expected_retryable: bool,
    }

    let io_error = std::io::Error::new(std::io::ErrorKind::Other, "disk");
    let serde_error = serde_json::from_str::<serde_json::Value>("{not-json}").unwrap_err();

    let cases = vec![
        Case {
            error: TesseraError::Configuration("max_steps must be at least 1".into()),
            expected_category: ErrorCategory::Configuration,
            expected_retryable: false,
        },
        Case {
            error: TesseraError::Io(io_error),
            expected_category: ErrorCategory::Io,
            expected_retryable: true,
        },
        Case {
            error: TesseraError::Serialization(serde_error),
            expected_category: ErrorCategory::Serialization,
            expected_retryable: false,
        },
        Case {
            error: TesseraError::UnknownProvider("nope".into()),
            expected_category: ErrorCategory::Routing,
            expected_retryable: false,
        },
        Case {
            error: TesseraError::NameCollision {
                name: "kb_x_y".into(),
                existing: QualifiedName::new("kb", "x-y"),
                incoming: QualifiedName::new("kb-x", "y"),
            },
            expected_category: ErrorCategory::Routing,
            expected_retryable: false,
        },
        Case {
            error: TesseraError::tool_execution("knowledge/lookup", "timeout"),
            expected_category: ErrorCategory::ToolExecution,
            expected_retryable: false,
        },
        Case {
            error: TesseraError::provider("anthropic", "overloaded"),
            expected_category: ErrorCategory::Provider,
            expected_retryable: true,
        },
        Case {
            error: TesseraError::InvalidArgument("bad base64".into()),
            expected_category: ErrorCategory::InvalidInput,
            expected_retryable: false,
        },
    ];

    for case in cases {
        assert_eq!(case.error.category(), case.expected_category, "{}", case.error);
        assert_eq!(case.error.is_retryable(), case.expected_retryable, "{}", case.error);
    }
}

#[test]
fn display_messages_carry_context() {
    let err = TesseraError::tool_execution("knowledge/lookup", "backend unavailable");
    assert_eq!(
        err.to_string(),
        "Tool execution error: knowledge/lookup — backend unavailable"
    );
    assert_eq!(
        TesseraError::UnknownCapability("ghost".into()).to_string(),
        "Unknown capability: ghost"
    );
}
