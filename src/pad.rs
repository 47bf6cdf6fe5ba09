//! Joypad (P1/JOYP) functions and structures.

use std::io::Cursor;

use gbxtal_common::{
    data::{read_u8, write_u8},
    error::Error,
};

use crate::{
    mmu::BusComponent,
    state::{StateComponent, StateFormat},
};

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

pub struct Pad {
    down: bool,
    up: bool,
    left: bool,
    right: bool,
    start: bool,
    select: bool,
    b: bool,
    a: bool,
    selection: PadSelection,
    int_pad: bool,
}

#[derive(Clone, Copy, PartialEq)]
pub enum PadSelection {
    Action,
    Direction,
}

#[cfg_attr(feature = "wasm", wasm_bindgen)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PadKey {
    Up,
    Down,
    Left,
    Right,
    Start,
    Select,
    A,
    B,
}

impl Pad {
    pub fn new() -> Self {
        Self {
            down: false,
            up: false,
            left: false,
            right: false,
            start: false,
            select: false,
            b: false,
            a: false,
            selection: PadSelection::Action,
            int_pad: false,
        }
    }

    pub fn reset(&mut self) {
        self.down = false;
        self.up = false;
        self.left = false;
        self.right = false;
        self.start = false;
        self.select = false;
        self.b = false;
        self.a = false;
        self.selection = PadSelection::Action;
        self.int_pad = false;
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr & 0x00ff {
            0x0000 => {
                let mut value = self.matrix_value();
                value |= if self.selection == PadSelection::Direction {
                    0x10
                } else {
                    0x00
                } | if self.selection == PadSelection::Action {
                    0x20
                } else {
                    0x00
                };
                value
            }
            addr => panic!("Reading from unknown Pad location 0x{:04x}", addr),
        }
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        match addr & 0x00ff {
            0x0000 => {
                let before = self.matrix_value();
                self.selection = if value & 0x10 == 0x00 {
                    PadSelection::Direction
                } else {
                    PadSelection::Action
                };
                self.latch_edge(before);
            }
            addr => panic!("Writing to unknown Pad location 0x{:04x}", addr),
        }
    }

    pub fn key_press(&mut self, key: PadKey) {
        let before = self.matrix_value();
        match key {
            PadKey::Up => self.up = true,
            PadKey::Down => self.down = true,
            PadKey::Left => self.left = true,
            PadKey::Right => self.right = true,
            PadKey::Start => self.start = true,
            PadKey::Select => self.select = true,
            PadKey::A => self.a = true,
            PadKey::B => self.b = true,
        }
        self.latch_edge(before);
    }

    pub fn key_lift(&mut self, key: PadKey) {
        match key {
            PadKey::Up => self.up = false,
            PadKey::Down => self.down = false,
            PadKey::Left => self.left = false,
            PadKey::Right => self.right = false,
            PadKey::Start => self.start = false,
            PadKey::Select => self.select = false,
            PadKey::A => self.a = false,
            PadKey::B => self.b = false,
        }
    }

    #[inline(always)]
    pub fn int_pad(&self) -> bool {
        self.int_pad
    }

    #[inline(always)]
    pub fn set_int_pad(&mut self, value: bool) {
        self.int_pad = value;
    }

    #[inline(always)]
    pub fn ack_pad(&mut self) {
        self.set_int_pad(false);
    }

    /// Active-low readout of the currently selected 4-bit key row,
    /// bits 0-3 only (selection bits not included).
    fn matrix_value(&self) -> u8 {
        match self.selection {
            PadSelection::Action => {
                (if self.a { 0x00 } else { 0x01 })
                    | (if self.b { 0x00 } else { 0x02 })
                    | (if self.select { 0x00 } else { 0x04 })
                    | (if self.start { 0x00 } else { 0x08 })
            }
            PadSelection::Direction => {
                (if self.right { 0x00 } else { 0x01 })
                    | (if self.left { 0x00 } else { 0x02 })
                    | (if self.up { 0x00 } else { 0x04 })
                    | (if self.down { 0x00 } else { 0x08 })
            }
        }
    }

    /// Requests the Joypad interrupt whenever any of the selected
    /// matrix lines transitions from high to low, matching the
    /// hardware's edge-triggered behavior on `P10`-`P13`.
    fn latch_edge(&mut self, before: u8) {
        let after = self.matrix_value();
        if before & !after & 0x0f != 0x00 {
            self.int_pad = true;
        }
    }
}

impl BusComponent for Pad {
    fn read(&self, addr: u16) -> u8 {
        self.read(addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.write(addr, value);
    }
}

impl Default for Pad {
    fn default() -> Self {
        Self::new()
    }
}

impl StateComponent for Pad {
    fn state(&self, _format: Option<StateFormat>) -> Result<Vec<u8>, Error> {
        let mut cursor = Cursor::new(vec![]);
        let mut buttons = 0x00u8;
        buttons |= self.up as u8;
        buttons |= (self.down as u8) << 1;
        buttons |= (self.left as u8) << 2;
        buttons |= (self.right as u8) << 3;
        buttons |= (self.start as u8) << 4;
        buttons |= (self.select as u8) << 5;
        buttons |= (self.a as u8) << 6;
        buttons |= (self.b as u8) << 7;
        write_u8(&mut cursor, buttons)?;
        write_u8(&mut cursor, (self.selection == PadSelection::Action) as u8)?;
        write_u8(&mut cursor, self.int_pad as u8)?;
        Ok(cursor.into_inner())
    }

    fn set_state(&mut self, data: &[u8], _format: Option<StateFormat>) -> Result<(), Error> {
        let mut cursor = Cursor::new(data);
        let buttons = read_u8(&mut cursor)?;
        self.up = buttons & 0x01 != 0x00;
        self.down = buttons & 0x02 != 0x00;
        self.left = buttons & 0x04 != 0x00;
        self.right = buttons & 0x08 != 0x00;
        self.start = buttons & 0x10 != 0x00;
        self.select = buttons & 0x20 != 0x00;
        self.a = buttons & 0x40 != 0x00;
        self.b = buttons & 0x80 != 0x00;
        let is_action = read_u8(&mut cursor)? != 0x00;
        self.selection = if is_action {
            PadSelection::Action
        } else {
            PadSelection::Direction
        };
        self.int_pad = read_u8(&mut cursor)? != 0x00;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Pad, PadKey};

    #[test]
    fn test_key_press_latches_interrupt_on_selected_row() {
        let mut pad = Pad::new();
        pad.write(0x0000, 0x10); // select action row (bit 4 clear)
        assert!(!pad.int_pad());
        pad.key_press(PadKey::A);
        assert!(pad.int_pad());
    }

    #[test]
    fn test_key_press_no_interrupt_on_unselected_row() {
        let mut pad = Pad::new();
        pad.write(0x0000, 0x20); // select direction row
        pad.key_press(PadKey::A);
        assert!(!pad.int_pad());
    }

    #[test]
    fn test_ack_pad_clears_interrupt() {
        let mut pad = Pad::new();
        pad.write(0x0000, 0x10);
        pad.key_press(PadKey::A);
        assert!(pad.int_pad());
        pad.ack_pad();
        assert!(!pad.int_pad());
    }
}
