//! Save-state serialization.
//!
//! Every core component that owns observable machine state (CPU,
//! timer, serial, PPU, APU, DMA, cartridge RAM/RTC) implements
//! [`StateComponent`], producing a flat byte blob that [`StateManager`]
//! assembles into a single snapshot file. Two on-disk container
//! formats are supported: the plain tagged-block format (`Bos`), its
//! RLE/Huffman-compressed sibling (`Bosc`), and read-only recognition
//! of the [BEES](https://github.com/LIJI32/SameBoy/blob/master/BESS.md)
//! interop layout (`Bess`) used by other emulators for cross-loading.

use std::io::{Cursor, Read, Write};

use gbxtal_common::{
    data::{read_u32, write_u32},
    error::Error,
    util::save_bmp,
};
use gbxtal_encoding::{huffman::decode_huffman, rle::decode_rle};

/// Hint passed to [`StateComponent::state`]/`set_state` allowing a
/// component to trim transient fields (eg: pixel buffers) from a
/// `Minimal` snapshot used for frequent autosaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFormat {
    Full,
    Minimal,
}

/// Implemented by every machine subsystem whose state must survive a
/// save/load round-trip.
pub trait StateComponent {
    fn state(&self, format: Option<StateFormat>) -> Result<Vec<u8>, Error>;
    fn set_state(&mut self, data: &[u8], format: Option<StateFormat>) -> Result<(), Error>;
}

/// Serializes a whole container (as opposed to a single component's
/// raw byte blob) to and from a byte stream.
pub trait Serialize {
    fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error>;
    fn read<R: Read>(reader: &mut R) -> Result<Self, Error>
    where
        Self: Sized;
}

const BOS_MAGIC: u32 = 0x00534f42; // "BOS\0"
const BOSC_MAGIC: u32 = 0x4353_4f42; // "BOSC"

/// A single tagged component block inside a [`BosState`] (eg: the CPU,
/// the PPU framebuffer, the cartridge RAM).
#[derive(Debug, Clone)]
pub struct StateBlock {
    pub tag: [u8; 4],
    pub data: Vec<u8>,
}

/// The uncompressed snapshot container: an optional BMP-compatible
/// thumbnail followed by an ordered list of tagged component blocks.
#[derive(Debug, Clone, Default)]
pub struct BosState {
    pub thumbnail: Vec<u8>,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub blocks: Vec<StateBlock>,
}

impl BosState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_thumbnail(&mut self, pixels: Vec<u8>, width: u32, height: u32) {
        self.thumbnail = pixels;
        self.thumbnail_width = width;
        self.thumbnail_height = height;
    }

    pub fn push_block(&mut self, tag: &[u8; 4], data: Vec<u8>) {
        self.blocks.push(StateBlock { tag: *tag, data });
    }

    pub fn block(&self, tag: &[u8; 4]) -> Option<&StateBlock> {
        self.blocks.iter().find(|block| &block.tag == tag)
    }

    /// Saves the embedded thumbnail, if any, as a standalone BMP file.
    pub fn save_image_bmp(&self, path: &str) -> Result<(), Error> {
        if self.thumbnail.is_empty() {
            return Err(Error::CustomError(String::from(
                "Save state does not contain a thumbnail image",
            )));
        }
        save_bmp(
            path,
            &self.thumbnail,
            self.thumbnail_width,
            self.thumbnail_height,
        )
    }
}

impl Serialize for BosState {
    fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        let mut cursor = Cursor::new(vec![]);
        write_u32(&mut cursor, BOS_MAGIC)?;
        write_u32(&mut cursor, self.thumbnail_width)?;
        write_u32(&mut cursor, self.thumbnail_height)?;
        write_u32(&mut cursor, self.thumbnail.len() as u32)?;
        cursor.write_all(&self.thumbnail)?;
        write_u32(&mut cursor, self.blocks.len() as u32)?;
        for block in &self.blocks {
            cursor.write_all(&block.tag)?;
            write_u32(&mut cursor, block.data.len() as u32)?;
            cursor.write_all(&block.data)?;
        }
        writer.write_all(&cursor.into_inner())?;
        Ok(())
    }

    fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let mut raw = vec![];
        reader.read_to_end(&mut raw)?;
        Self::parse(&raw)
    }
}

impl BosState {
    fn parse(raw: &[u8]) -> Result<Self, Error> {
        let mut cursor = Cursor::new(raw);
        let magic = read_u32(&mut cursor)?;
        if magic != BOS_MAGIC {
            return Err(Error::InvalidData);
        }
        let thumbnail_width = read_u32(&mut cursor)?;
        let thumbnail_height = read_u32(&mut cursor)?;
        let thumbnail_len = read_u32(&mut cursor)? as usize;
        let mut thumbnail = vec![0u8; thumbnail_len];
        cursor.read_exact(&mut thumbnail)?;

        let block_count = read_u32(&mut cursor)?;
        let mut blocks = Vec::with_capacity(block_count as usize);
        for _ in 0..block_count {
            let mut tag = [0u8; 4];
            cursor.read_exact(&mut tag)?;
            let len = read_u32(&mut cursor)? as usize;
            let mut data = vec![0u8; len];
            cursor.read_exact(&mut data)?;
            blocks.push(StateBlock { tag, data });
        }

        Ok(Self {
            thumbnail,
            thumbnail_width,
            thumbnail_height,
            blocks,
        })
    }
}

/// The compressed container: a `Bos` payload run through RLE then
/// Huffman coding, used for on-disk/network-transmitted snapshots.
#[derive(Debug, Clone)]
pub struct BoscState {
    bos: BosState,
}

impl BoscState {
    pub fn bos(&self) -> &BosState {
        &self.bos
    }

    pub fn into_bos(self) -> BosState {
        self.bos
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStateFormat {
    Bos,
    Bosc,
    Bess,
}

pub struct StateManager;

impl StateManager {
    /// Sniffs the container format from the leading magic bytes of a
    /// save-state file, without fully parsing its contents.
    pub fn format(data: &[u8]) -> Result<SaveStateFormat, Error> {
        if data.len() < 4 {
            return Err(Error::InvalidData);
        }
        if data[0..4] == *b"BESS" {
            return Ok(SaveStateFormat::Bess);
        }
        let mut cursor = Cursor::new(data);
        let magic = read_u32(&mut cursor)?;
        match magic {
            BOS_MAGIC => Ok(SaveStateFormat::Bos),
            BOSC_MAGIC => Ok(SaveStateFormat::Bosc),
            _ => Err(Error::InvalidData),
        }
    }

    pub fn read_bos(data: &[u8]) -> Result<BosState, Error> {
        BosState::parse(data)
    }

    /// Reads a `Bosc` (compressed) save-state file, reversing the
    /// RLE-then-Huffman pipeline applied at write time to recover the
    /// underlying `Bos` container.
    pub fn read_bosc(data: &[u8]) -> Result<BoscState, Error> {
        let mut cursor = Cursor::new(data);
        let magic = read_u32(&mut cursor)?;
        if magic != BOSC_MAGIC {
            return Err(Error::InvalidData);
        }
        let payload_len = read_u32(&mut cursor)? as usize;
        let mut payload = vec![0u8; payload_len];
        cursor.read_exact(&mut payload)?;

        let huffman_decoded = decode_huffman(&payload)?;
        let bos_raw = decode_rle(&huffman_decoded)?;
        let bos = BosState::parse(&bos_raw)?;

        Ok(BoscState { bos })
    }

    /// Writes a `Bos` container compressed into the `Bosc` format.
    pub fn write_bosc<W: Write>(state: &BosState, writer: &mut W) -> Result<(), Error> {
        let mut bos_raw = Cursor::new(vec![]);
        state.write(&mut bos_raw)?;
        let bos_raw = bos_raw.into_inner();

        let rle_encoded = gbxtal_encoding::rle::encode_rle(&bos_raw)?;
        let huffman_encoded = gbxtal_encoding::huffman::encode_huffman(&rle_encoded)?;

        let mut cursor = Cursor::new(vec![]);
        write_u32(&mut cursor, BOSC_MAGIC)?;
        write_u32(&mut cursor, huffman_encoded.len() as u32)?;
        cursor.write_all(&huffman_encoded)?;
        writer.write_all(&cursor.into_inner())?;
        Ok(())
    }
}

/// Layout structures mirroring the external
/// [BESS](https://github.com/LIJI32/SameBoy/blob/master/BESS.md) save
/// state format, kept for read-only interop with other emulators that
/// export or expect this container shape. Not used by the native
/// `Bos`/`Bosc` round-trip above.
#[repr(packed)]
pub struct BeesBlock {
    pub magic: u32,
    pub size: u32,
}

#[repr(packed)]
pub struct BeesBuffer {
    pub size: u32,
    pub offset: u32,
}

#[repr(packed)]
pub struct BeesFooter {
    pub start_offset: u32,
    pub magic: u32,
}

#[repr(packed)]
pub struct BeesCore {
    pub header: BeesBlock,

    pub major: u16,
    pub minor: u16,

    pub model: u32,

    pub pc: u16,
    pub af: u16,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,
    pub sp: u16,

    pub ime: u8,
    pub ie: u8,
    // 0 = running; 1 = halted; 2 = stopped
    pub execution_mode: u8,
    _padding: u8,

    pub io_registers: [u8; 0x80],

    pub ram: BeesBuffer,
    pub vram: BeesBuffer,
    pub mbc_ram: BeesBuffer,
    pub oam: BeesBuffer,
    pub hram: BeesBuffer,
    pub background_palettes: BeesBuffer,
    pub object_palettes: BeesBuffer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bos_roundtrip() {
        let mut state = BosState::new();
        state.set_thumbnail(vec![0xff, 0x00, 0x00], 1, 1);
        state.push_block(b"CPUU", vec![1, 2, 3, 4]);
        state.push_block(b"TIMR", vec![5, 6]);

        let mut buffer = Cursor::new(vec![]);
        state.write(&mut buffer).unwrap();

        let restored = BosState::parse(buffer.get_ref()).unwrap();
        assert_eq!(restored.thumbnail, vec![0xff, 0x00, 0x00]);
        assert_eq!(restored.blocks.len(), 2);
        assert_eq!(restored.block(b"CPUU").unwrap().data, vec![1, 2, 3, 4]);
        assert_eq!(restored.block(b"TIMR").unwrap().data, vec![5, 6]);
    }

    #[test]
    fn test_bosc_roundtrip() {
        let mut state = BosState::new();
        state.push_block(b"CPUU", vec![9, 9, 9, 9, 9, 9, 9, 9]);

        let mut compressed = Cursor::new(vec![]);
        StateManager::write_bosc(&state, &mut compressed).unwrap();
        let compressed = compressed.into_inner();

        assert_eq!(StateManager::format(&compressed).unwrap(), SaveStateFormat::Bosc);

        let decoded = StateManager::read_bosc(&compressed).unwrap();
        assert_eq!(decoded.bos().block(b"CPUU").unwrap().data, vec![9; 8]);
    }
}
