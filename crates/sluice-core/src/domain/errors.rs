//! Errors - エラー型と分類
//!
//! ports の実装はすべて `SluiceError` を返します。
//! 呼び出し側は `kind()` で運用上の分類を見て、ログレベルや応答コードを決めます。

use thiserror::Error;

/// ErrorKind は実行エラーの分類
///
/// - Transient: 一時的なエラー（呼び出し元の再配送で回復しうる）
/// - Permanent: 恒久的なエラー（設定・入力の誤り）
/// - Infrastructure: 外部システム（S3 / EventBridge / ECS / DynamoDB）の障害
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum SluiceError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("payload decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("object store error: {0}")]
    ObjectStore(String),

    #[error("event bus error: {0}")]
    EventBus(String),

    #[error("orchestrator error: {0}")]
    Orchestrator(String),

    #[error("idempotency store error: {0}")]
    Idempotency(String),
}

impl SluiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SluiceError::Config(_) | SluiceError::Decode(_) => ErrorKind::Permanent,
            SluiceError::ObjectStore(_) | SluiceError::Idempotency(_) => ErrorKind::Transient,
            SluiceError::EventBus(_) | SluiceError::Orchestrator(_) => {
                ErrorKind::Infrastructure
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::config(SluiceError::Config("x".into()), ErrorKind::Permanent)]
    #[case::object_store(SluiceError::ObjectStore("x".into()), ErrorKind::Transient)]
    #[case::idempotency(SluiceError::Idempotency("x".into()), ErrorKind::Transient)]
    #[case::event_bus(SluiceError::EventBus("x".into()), ErrorKind::Infrastructure)]
    #[case::orchestrator(SluiceError::Orchestrator("x".into()), ErrorKind::Infrastructure)]
    fn errors_are_classified(#[case] err: SluiceError, #[case] expected: ErrorKind) {
        assert_eq!(err.kind(), expected);
    }

    #[test]
    fn decode_errors_convert_from_serde() {
        let err: SluiceError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, SluiceError::Decode(_)));
        assert!(err.to_string().starts_with("payload decode failed"));
    }
}
