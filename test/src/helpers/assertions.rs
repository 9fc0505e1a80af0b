/// Assert that a recorded log contains a message at the given level
#[macro_export]
macro_rules! assert_logged {
    ($log:expr, $level:expr, $needle:expr) => {
        assert!(
            $log.contains($level, $needle),
            "Expected a {:?} log containing {:?}, got {:?}",
            $level,
            $needle,
            $log.entries()
        );
    };
}

/// Assert that a recorded log has no message at the given level containing the text
#[macro_export]
macro_rules! assert_not_logged {
    ($log:expr, $level:expr, $needle:expr) => {
        assert!(
            !$log.contains($level, $needle),
            "Unexpected {:?} log containing {:?}",
            $level,
            $needle
        );
    };
}

/// Assert that an operation reported a failure with the given reason
#[macro_export]
macro_rules! assert_failed_with {
    ($slot:expr, $reason:expr) => {
        let result = $slot.get().expect("operation should have completed");
        assert_eq!(
            result.result_code,
            strata_client::shared::ResultCode::Failed,
            "Expected a failure, got {:?}",
            result
        );
        assert_eq!(result.failure_reason, $reason);
    };
}
