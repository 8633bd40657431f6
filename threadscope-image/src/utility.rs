//! 文字列変換ユーティリティ

/// 固定長のバイト配列を表示用文字列に変換する
///
/// 最初のNULバイトか配列の終端で打ち切ります。
/// UTF-8として不正なバイトは置換文字に変換します。
pub fn array_to_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
