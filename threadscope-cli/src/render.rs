//! 表形式レポートのレンダラ

use anyhow::Result;
use clap::ValueEnum;
use serde_json::{Map, Value};
use std::io::Write;
use threadscope_core::{Cell, Column};

/// 出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererKind {
    /// タブ区切りのテキスト
    Quick,
    /// CSV
    Csv,
    /// 1行1オブジェクトのJSON
    Json,
}

/// 行を1つずつ書き出す
///
/// 行の取り出しでエラーが発生した場合は、それまでに書いた分をフラッシュしてから返します。
/// 戻り値は書き出した行数です。
pub fn render<W, I>(kind: RendererKind, columns: &[Column], rows: I, out: &mut W) -> Result<usize>
where
    W: Write,
    I: Iterator<Item = Result<Vec<Cell>>>,
{
    write_header(kind, columns, out)?;

    let mut count = 0;
    for row in rows {
        let cells = match row {
            Ok(cells) => cells,
            Err(e) => {
                out.flush()?;
                return Err(e);
            }
        };
        write_row(kind, columns, &cells, out)?;
        count += 1;
    }

    out.flush()?;
    Ok(count)
}

fn write_header<W: Write>(kind: RendererKind, columns: &[Column], out: &mut W) -> Result<()> {
    match kind {
        RendererKind::Quick => {
            let names: Vec<_> = columns.iter().map(|c| c.name).collect();
            writeln!(out, "{}", names.join("\t"))?;
            writeln!(out)?;
        }
        RendererKind::Csv => {
            let names: Vec<_> = columns.iter().map(|c| csv_field(c.name)).collect();
            writeln!(out, "{}", names.join(","))?;
        }
        RendererKind::Json => {}
    }
    Ok(())
}

fn write_row<W: Write>(kind: RendererKind, columns: &[Column], cells: &[Cell], out: &mut W) -> Result<()> {
    match kind {
        RendererKind::Quick => {
            let fields: Vec<_> = cells.iter().map(quick_field).collect();
            writeln!(out, "{}", fields.join("\t"))?;
        }
        RendererKind::Csv => {
            let fields: Vec<_> = cells.iter().map(|c| csv_field(&c.to_string())).collect();
            writeln!(out, "{}", fields.join(","))?;
        }
        RendererKind::Json => {
            let object: Map<String, Value> = columns
                .iter()
                .zip(cells)
                .map(|(column, cell)| (column.name.to_string(), json_value(cell)))
                .collect();
            serde_json::to_writer(&mut *out, &Value::Object(object))?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// 文字列セルの制御文字をエスケープし、1行に1レコードを保つ
fn quick_field(cell: &Cell) -> String {
    match cell {
        Cell::Str(s) => s
            .chars()
            .map(|c| if c.is_control() { c.escape_default().to_string() } else { c.to_string() })
            .collect(),
        other => other.to_string(),
    }
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn json_value(cell: &Cell) -> Value {
    match cell {
        Cell::Address(addr) => Value::from(*addr),
        Cell::Int(value) => Value::from(*value),
        Cell::Str(s) => Value::from(s.as_str()),
    }
}
