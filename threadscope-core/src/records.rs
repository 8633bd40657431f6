//! プロセス・スレッドレコードの定義
//!
//! メモリイメージを走査するコラボレータが実装するトレイトと、
//! そこから受け取る読み取り専用のレコード型をまとめています。

use crate::{PidFilter, Result};

/// プロセスID・スレッドID
pub type Pid = i32;

/// イメージ内のアドレス（ライブなポインタではなく位置を示すキー）
pub type Address = u64;

/// プロセスの資格情報
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Credentials {
    pub uid: u32,
    pub gid: u32,
    pub euid: u32,
}

/// スレッドレコード
///
/// 表示名はスレッド自身ではなく所属プロセスの名前をそのまま使います。
/// スレッド固有の名前がイメージ上に存在しても参照しません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRecord {
    /// スレッドID
    pub pid: Pid,
    /// スレッド自身のスレッドグループアンカーのアドレス
    pub offset: Address,
}

impl ThreadRecord {
    /// スレッドレコードを作成する
    pub fn new(pid: Pid, offset: Address) -> Self {
        Self { pid, offset }
    }

    /// 表示名を取得する（所属プロセスの名前）
    pub fn name<'a>(&self, owner_name: &'a str) -> &'a str {
        owner_name
    }
}

/// プロセスレコード
///
/// フィールドの読み取りはイメージへのアクセスを伴うため失敗し得ます。
/// `threads()` は一度だけ走査できる有限の遅延シーケンスを返します。
pub trait ProcessRecord {
    /// スレッド列挙のイテレータ
    type Threads: Iterator<Item = Result<ThreadRecord>>;

    /// プロセスIDを取得する
    fn pid(&self) -> Result<Pid>;

    /// 表示名を取得する
    fn name(&self) -> Result<String>;

    /// 資格情報を取得する
    fn credentials(&self) -> Result<Credentials>;

    /// スレッドグループアンカーのアドレスを取得する
    fn group_offset(&self) -> Address;

    /// スレッドを列挙する
    fn threads(&self) -> Self::Threads;
}

/// プロセスの供給元
///
/// `filter` に一致しないプロセスは、スレッドを含めて一切走査せずに
/// 読み飛ばす責任を持ちます。
pub trait ProcessSource {
    type Process: ProcessRecord;
    type Processes: Iterator<Item = Result<Self::Process>>;

    /// フィルタ済みのプロセス列を返す
    fn processes(self, filter: PidFilter) -> Self::Processes;
}
