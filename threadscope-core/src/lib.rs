//! threadscope のコア機能
//!
//! このクレートは、メモリイメージ内のプロセスとスレッドを相関させる中核ロジックを提供します。
//! プロセスの供給元から受け取ったレコードをスレッド単位の行に展開し、
//! 固定の列定義とともにレポータへ渡します。

pub mod correlate;
pub mod errors;
pub mod filter;
pub mod grid;
pub mod parse;
pub mod records;
pub mod schema;

pub use correlate::{report, ThreadRows};
pub use errors::GridError;
pub use filter::PidFilter;
pub use grid::TreeGrid;
pub use records::{Address, Credentials, Pid, ProcessRecord, ProcessSource, ThreadRecord};
pub use schema::{Cell, Column, ColumnType, GridRow, ThreadRow, THREAD_COLUMNS};

/// コア処理の結果型
pub type Result<T> = anyhow::Result<T>;
