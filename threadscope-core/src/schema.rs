//! 出力スキーマ
//!
//! レポータに渡す列定義と、相関処理が生成する行の型です。
//! `THREAD_COLUMNS` の順序と型は `ThreadRow::cells` と完全に一致させます。

use crate::{Address, Pid};
use std::fmt;

/// 列の意味的な型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// アドレス（16進表示）
    Address,
    /// 整数
    Int,
    /// 文字列
    Str,
}

/// 列定義
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnType) -> Self {
        Self { name, kind }
    }
}

/// スレッドレポートの列定義
pub const THREAD_COLUMNS: [Column; 9] = [
    Column::new("Offset", ColumnType::Address),
    Column::new("PID", ColumnType::Int),
    Column::new("COMM", ColumnType::Str),
    Column::new("Thread PID", ColumnType::Int),
    Column::new("Thread Name", ColumnType::Str),
    Column::new("Thread Offset", ColumnType::Address),
    Column::new("uid", ColumnType::Int),
    Column::new("gid", ColumnType::Int),
    Column::new("euid", ColumnType::Int),
];

/// 型付きのセル値
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Address(Address),
    Int(i64),
    Str(String),
}

impl Cell {
    /// セルの列型を取得する
    pub fn kind(&self) -> ColumnType {
        match self {
            Cell::Address(_) => ColumnType::Address,
            Cell::Int(_) => ColumnType::Int,
            Cell::Str(_) => ColumnType::Str,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Address(addr) => write!(f, "0x{:x}", addr),
            Cell::Int(value) => write!(f, "{}", value),
            Cell::Str(s) => f.write_str(s),
        }
    }
}

/// レポータに渡せる行
pub trait GridRow {
    /// 列順に並べたセルを返す
    fn cells(&self) -> Vec<Cell>;
}

/// スレッドレポートの1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRow {
    pub process_offset: Address,
    pub process_pid: Pid,
    pub process_name: String,
    pub thread_pid: Pid,
    pub thread_name: String,
    pub thread_offset: Address,
    pub uid: u32,
    pub gid: u32,
    pub euid: u32,
}

impl GridRow for ThreadRow {
    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Address(self.process_offset),
            Cell::Int(self.process_pid.into()),
            Cell::Str(self.process_name.clone()),
            Cell::Int(self.thread_pid.into()),
            Cell::Str(self.thread_name.clone()),
            Cell::Address(self.thread_offset),
            Cell::Int(self.uid.into()),
            Cell::Int(self.gid.into()),
            Cell::Int(self.euid.into()),
        ]
    }
}
