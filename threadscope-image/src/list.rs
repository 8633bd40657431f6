//! `struct list_head` の走査

use crate::error::ImageError;
use crate::{LinuxKernel, Result};
use std::collections::HashSet;
use tracing::{trace, warn};

/// 循環リストを走査し、各エントリを含む構造体のアドレスを返すイテレータ
///
/// リストの先頭（`head`）自体は返しません。`next` が先頭に戻った時点で終了します。
/// 同じノードに2度到達した場合はリストが壊れているとみなし、警告を出して打ち切ります。
pub struct ListWalker<'a> {
    kernel: &'a LinuxKernel,
    head: u64,
    member_offset: u64,
    cursor: u64,
    seen: HashSet<u64>,
    done: bool,
    truncated: bool,
}

impl<'a> ListWalker<'a> {
    /// `head` から走査を開始する
    ///
    /// # Arguments
    /// * `head` - 先頭の `list_head` のアドレス
    /// * `member_offset` - エントリ構造体内での `list_head` メンバのオフセット
    pub fn new(kernel: &'a LinuxKernel, head: u64, member_offset: u64) -> Self {
        Self {
            kernel,
            head,
            member_offset,
            cursor: head,
            seen: HashSet::new(),
            done: false,
            truncated: false,
        }
    }

    /// 循環を検出して走査を打ち切ったか
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    fn fail(&mut self, err: anyhow::Error) -> Option<Result<u64>> {
        self.done = true;
        Some(Err(err))
    }
}

impl Iterator for ListWalker<'_> {
    type Item = Result<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        // list_head の最初のメンバが next
        let next = match self.kernel.read_pointer(self.cursor) {
            Ok(next) => next,
            Err(e) => return self.fail(e),
        };

        if next == 0 {
            return self.fail(ImageError::NullPointer { addr: self.cursor }.into());
        }

        if next == self.head {
            self.done = true;
            return None;
        }

        if !self.seen.insert(next) {
            warn!(
                "list at 0x{:x} revisits node 0x{:x}, stopping walk after {} entries",
                self.head,
                next,
                self.seen.len()
            );
            self.done = true;
            self.truncated = true;
            return None;
        }

        trace!("list 0x{:x}: node 0x{:x}", self.head, next);
        self.cursor = next;
        Some(Ok(next.wrapping_sub(self.member_offset)))
    }
}
