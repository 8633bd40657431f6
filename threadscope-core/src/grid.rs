//! 表形式レポートの受け渡し
//!
//! 列定義と行の遅延シーケンスを組にしてレンダラへ渡します。
//! 各行は取り出す時点で列定義と照合されます。

use crate::errors::GridError;
use crate::{Cell, Column, GridRow, Result};

/// 列定義と行シーケンスの組
pub struct TreeGrid<R> {
    columns: &'static [Column],
    rows: R,
    index: usize,
    done: bool,
}

impl<R, T> TreeGrid<R>
where
    R: Iterator<Item = Result<T>>,
    T: GridRow,
{
    /// 列定義と行シーケンスからグリッドを作成する
    pub fn new(columns: &'static [Column], rows: R) -> Self {
        Self {
            columns,
            rows,
            index: 0,
            done: false,
        }
    }

    /// 列定義を取得する
    pub fn columns(&self) -> &'static [Column] {
        self.columns
    }

    /// 次の行を列定義と照合して取り出す
    ///
    /// エラーを返した後は `None` を返し続けます。
    pub fn next_row(&mut self) -> Option<Result<Vec<Cell>>> {
        if self.done {
            return None;
        }

        let result = match self.rows.next()? {
            Ok(row) => self.check(row.cells()),
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.done = true;
        }
        self.index += 1;
        Some(result)
    }

    fn check(&self, cells: Vec<Cell>) -> Result<Vec<Cell>> {
        if cells.len() != self.columns.len() {
            return Err(GridError::WidthMismatch {
                row: self.index,
                expected: self.columns.len(),
                actual: cells.len(),
            }
            .into());
        }

        for (cell, column) in cells.iter().zip(self.columns) {
            if cell.kind() != column.kind {
                return Err(GridError::TypeMismatch {
                    row: self.index,
                    column: column.name,
                    expected: column.kind,
                    actual: cell.kind(),
                }
                .into());
            }
        }

        Ok(cells)
    }
}

impl<R, T> Iterator for TreeGrid<R>
where
    R: Iterator<Item = Result<T>>,
    T: GridRow,
{
    type Item = Result<Vec<Cell>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row()
    }
}
