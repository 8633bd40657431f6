//! エラー型

use crate::ColumnType;
use thiserror::Error;

/// 行が列定義と一致しない場合のエラー
#[derive(Debug, Error)]
pub enum GridError {
    #[error("row {row}: expected {expected} cells, got {actual}")]
    WidthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("row {row}: column '{column}' expects {expected:?}, got {actual:?}")]
    TypeMismatch {
        row: usize,
        column: &'static str,
        expected: ColumnType,
        actual: ColumnType,
    },
}
