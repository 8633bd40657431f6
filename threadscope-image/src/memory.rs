//! メモリイメージへのアクセス機能

use crate::error::ImageError;
use crate::layout::deserialize_address;
use crate::Result;
use serde::Deserialize;
use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::Path;
use tracing::debug;

/// メモリから読み取り可能な型
pub trait MemoryReadable: Sized {
    /// バイト配列から値を構築
    fn from_le_bytes(bytes: &[u8]) -> Result<Self>;

    /// 型のサイズ（バイト数）
    fn size() -> usize;
}

impl MemoryReadable for u64 {
    fn from_le_bytes(bytes: &[u8]) -> Result<Self> {
        let array: [u8; 8] = bytes.try_into()
            .map_err(|_| anyhow::anyhow!("Failed to convert {} bytes to u64 array (expected 8 bytes)", bytes.len()))?;
        Ok(u64::from_le_bytes(array))
    }

    fn size() -> usize { 8 }
}

impl MemoryReadable for u32 {
    fn from_le_bytes(bytes: &[u8]) -> Result<Self> {
        let array: [u8; 4] = bytes.try_into()
            .map_err(|_| anyhow::anyhow!("Failed to convert {} bytes to u32 array (expected 4 bytes)", bytes.len()))?;
        Ok(u32::from_le_bytes(array))
    }

    fn size() -> usize { 4 }
}

impl MemoryReadable for u16 {
    fn from_le_bytes(bytes: &[u8]) -> Result<Self> {
        let array: [u8; 2] = bytes.try_into()
            .map_err(|_| anyhow::anyhow!("Failed to convert {} bytes to u16 array (expected 2 bytes)", bytes.len()))?;
        Ok(u16::from_le_bytes(array))
    }

    fn size() -> usize { 2 }
}

impl MemoryReadable for u8 {
    fn from_le_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(anyhow::anyhow!("Cannot read u8 from empty bytes"));
        }
        Ok(bytes[0])
    }

    fn size() -> usize { 1 }
}

/// 仮想アドレスからイメージ内オフセットへの線形マッピング
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Mapping {
    /// 仮想アドレスの先頭
    #[serde(rename = "virtual", deserialize_with = "deserialize_address")]
    pub virt: u64,
    /// イメージファイル内の先頭オフセット
    #[serde(deserialize_with = "deserialize_address")]
    pub physical: u64,
    /// 長さ（バイト）
    #[serde(deserialize_with = "deserialize_address")]
    pub length: u64,
}

impl Mapping {
    pub fn new(virt: u64, physical: u64, length: u64) -> Self {
        Self { virt, physical, length }
    }

    /// `[addr, addr + size)` 全体を含む場合にイメージ内オフセットを返す
    fn translate(&self, addr: u64, size: usize) -> Option<u64> {
        let delta = addr.checked_sub(self.virt)?;
        let end = delta.checked_add(size as u64)?;
        if end > self.length {
            return None;
        }
        self.physical.checked_add(delta)
    }
}

/// イメージの実体
enum Backing {
    File(File),
    Bytes(Vec<u8>),
}

/// メモリイメージ
///
/// 生のメモリダンプを仮想アドレスで読み取ります。
/// 1回の読み取りは1つのマッピング内に収まっている必要があります。
pub struct ImageMemory {
    backing: Backing,
    mappings: Vec<Mapping>,
}

impl ImageMemory {
    /// イメージファイルを開く
    pub fn open<P: AsRef<Path>>(path: P, mappings: Vec<Mapping>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| anyhow::anyhow!("Failed to open image {}: {}", path.display(), e))?;
        let len = file.metadata()?.len();
        debug!("Opened image {} ({} bytes, {} mappings)", path.display(), len, mappings.len());

        Ok(Self {
            backing: Backing::File(file),
            mappings,
        })
    }

    /// メモリ上のバイト列をイメージとして扱う
    pub fn from_bytes(data: Vec<u8>, mappings: Vec<Mapping>) -> Self {
        Self {
            backing: Backing::Bytes(data),
            mappings,
        }
    }

    /// 仮想アドレスをイメージ内オフセットに変換する
    pub fn translate(&self, addr: u64, size: usize) -> Result<u64> {
        self.mappings
            .iter()
            .find_map(|m| m.translate(addr, size))
            .ok_or_else(|| ImageError::Unmapped { addr, size }.into())
    }

    /// メモリからデータを読み取る
    pub fn read(&self, addr: u64, size: usize) -> Result<Vec<u8>> {
        let offset = self.translate(addr, size)?;
        let mut buffer = vec![0u8; size];

        match &self.backing {
            Backing::File(file) => {
                file.read_exact_at(&mut buffer, offset).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::UnexpectedEof {
                        anyhow::Error::from(ImageError::ShortRead { offset, wanted: size })
                    } else {
                        anyhow::anyhow!("Failed to read {} bytes at 0x{:x}: {}", size, addr, e)
                    }
                })?;
            }
            Backing::Bytes(data) => {
                let start = usize::try_from(offset)?;
                let src = start
                    .checked_add(size)
                    .and_then(|end| data.get(start..end))
                    .ok_or(ImageError::ShortRead { offset, wanted: size })?;
                buffer.copy_from_slice(src);
            }
        }

        Ok(buffer)
    }

    /// 型付き値を読み取る（ジェネリック版）
    ///
    /// # Examples
    /// ```ignore
    /// let value: u64 = memory.read_typed(addr)?;
    /// let value: u32 = memory.read_typed(addr)?;
    /// ```
    pub fn read_typed<T: MemoryReadable>(&self, addr: u64) -> Result<T> {
        let bytes = self.read(addr, T::size())?;
        T::from_le_bytes(&bytes)
    }

    /// u64値を読み取る（リトルエンディアン）
    pub fn read_u64(&self, addr: u64) -> Result<u64> {
        self.read_typed(addr)
    }

    /// u32値を読み取る（リトルエンディアン）
    pub fn read_u32(&self, addr: u64) -> Result<u32> {
        self.read_typed(addr)
    }

    /// u16値を読み取る（リトルエンディアン）
    pub fn read_u16(&self, addr: u64) -> Result<u16> {
        self.read_typed(addr)
    }

    /// u8値を読み取る
    pub fn read_u8(&self, addr: u64) -> Result<u8> {
        self.read_typed(addr)
    }
}
