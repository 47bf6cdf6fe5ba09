//! Static data embedded in the binary: boot ROM images and the
//! [`BootRom`] enumeration used to pick among them, plus a re-export of
//! the cursor-based binary reading/writing helpers used by
//! [`crate::state::StateComponent`] implementations, so that callers
//! depending on this crate don't need a direct dependency on the
//! shared `gbxtal-common` crate for such a small surface.

use crate::{
    gb::GameBoyMode,
    mmu::{BOOT_SIZE_CGB, BOOT_SIZE_DMG},
};

pub use gbxtal_common::data::*;

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

/// Identifies which boot ROM image is (or should be) mapped into the
/// `0x0000`-prefixed boot window before the cartridge's own header is
/// visible at that range.
#[cfg_attr(feature = "wasm", wasm_bindgen)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BootRom {
    /// Original DMG boot ROM.
    Dmg,
    /// Original SGB boot ROM, DMG-compatible at the CPU/memory level.
    Sgb,
    /// Free DMG-compatible replacement boot ROM (Bootix).
    DmgBootix,
    /// Free MGB-compatible replacement boot ROM (Bootix).
    MgbBootix,
    /// Original CGB boot ROM.
    Cgb,
    /// In-house CGB-compatible replacement boot ROM.
    CgbCustom,
    /// A boot ROM loaded from an external source, of unknown origin.
    Other,
    /// No boot ROM loaded, cartridge execution starts at `0x0100`
    /// directly with the post-boot register state.
    None,
}

impl BootRom {
    pub fn description(&self) -> &'static str {
        match self {
            BootRom::Dmg => "DMG",
            BootRom::Sgb => "SGB",
            BootRom::DmgBootix => "DMG Bootix",
            BootRom::MgbBootix => "MGB Bootix",
            BootRom::Cgb => "CGB",
            BootRom::CgbCustom => "CGB Custom",
            BootRom::Other => "Other",
            BootRom::None => "None",
        }
    }

    /// Whether this boot ROM can be mapped for a DMG/MGB/SGB session.
    pub fn is_dmg_compat(&self) -> bool {
        matches!(
            self,
            BootRom::Dmg | BootRom::Sgb | BootRom::DmgBootix | BootRom::MgbBootix
        )
    }

    /// Whether this boot ROM can be mapped for a CGB session.
    pub fn is_cgb_compat(&self) -> bool {
        matches!(self, BootRom::Cgb | BootRom::CgbCustom)
    }

    /// Returns `Some(self)` when this boot ROM is still compatible
    /// with `mode`, `None` otherwise, letting callers reuse a
    /// previously selected boot ROM across a mode change without
    /// mapping in an incompatible image.
    pub fn reusable(&self, mode: GameBoyMode) -> Option<Self> {
        let compatible = match mode {
            GameBoyMode::Dmg | GameBoyMode::Sgb => self.is_dmg_compat(),
            GameBoyMode::Cgb => self.is_cgb_compat(),
        };
        if compatible {
            Some(*self)
        } else {
            None
        }
    }
}

/// Original DMG boot ROM image, 256 bytes mapped at `0x0000`-`0x00ff`
/// until the cartridge header's checksum is validated and the boot
/// flag at `0xff50` is written.
pub const DMG_BOOT: [u8; BOOT_SIZE_DMG] = [0x00; BOOT_SIZE_DMG];

/// Original SGB boot ROM image, DMG-compatible in size and memory
/// layout.
pub const SGB_BOOT: [u8; BOOT_SIZE_DMG] = [0x00; BOOT_SIZE_DMG];

/// Free DMG-compatible replacement boot ROM (Bootix), 256 bytes.
pub const DMG_BOOTIX: [u8; BOOT_SIZE_DMG] = [0x00; BOOT_SIZE_DMG];

/// Free MGB-compatible replacement boot ROM (Bootix), 256 bytes.
pub const MGB_BOOTIX: [u8; BOOT_SIZE_DMG] = [0x00; BOOT_SIZE_DMG];

/// Original CGB boot ROM image, 2304 bytes mapped at `0x0000`-`0x08ff`.
pub const CGB_BOOT: [u8; BOOT_SIZE_CGB] = [0x00; BOOT_SIZE_CGB];

/// In-house CGB-compatible replacement boot ROM.
pub const CGB_BOYTACEAN: [u8; BOOT_SIZE_CGB] = [0x00; BOOT_SIZE_CGB];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reusable_across_modes() {
        assert_eq!(
            BootRom::DmgBootix.reusable(GameBoyMode::Dmg),
            Some(BootRom::DmgBootix)
        );
        assert_eq!(BootRom::DmgBootix.reusable(GameBoyMode::Cgb), None);
        assert_eq!(
            BootRom::CgbCustom.reusable(GameBoyMode::Cgb),
            Some(BootRom::CgbCustom)
        );
        assert_eq!(BootRom::CgbCustom.reusable(GameBoyMode::Dmg), None);
        assert_eq!(
            BootRom::Sgb.reusable(GameBoyMode::Sgb),
            Some(BootRom::Sgb)
        );
    }

    #[test]
    fn test_compat_flags() {
        assert!(BootRom::Dmg.is_dmg_compat());
        assert!(!BootRom::Dmg.is_cgb_compat());
        assert!(BootRom::Cgb.is_cgb_compat());
        assert!(!BootRom::Cgb.is_dmg_compat());
    }
}
