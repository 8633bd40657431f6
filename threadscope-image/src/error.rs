//! イメージアクセスのエラー型

use thiserror::Error;

/// メモリイメージの読み取り・解釈で発生するエラー
#[derive(Debug, Error)]
pub enum ImageError {
    /// どのマッピングにも含まれないアドレス
    #[error("address 0x{addr:x} (+{size} bytes) is not covered by any mapping")]
    Unmapped { addr: u64, size: usize },

    /// イメージの末尾を越えた読み取り
    #[error("short read at image offset 0x{offset:x}: wanted {wanted} bytes")]
    ShortRead { offset: u64, wanted: usize },

    /// リストのnextポインタがNULL
    #[error("null list pointer at 0x{addr:x}")]
    NullPointer { addr: u64 },

    /// プロファイルの内容が不正
    #[error("invalid kernel profile: {0}")]
    BadProfile(String),
}
