/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * Redpesk interface code/config use MIT License and can be freely copy/modified even within proprietary code
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 *
 * References:
 *    https://www.kernel.org/doc/html/latest/networking/can.html
 *
*/
use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub type CanId = u32;

bitflags! {
    #[derive(Copy, Clone, PartialEq, Eq, Debug)]
    pub struct HeaderFlags: u32 {
        /// ERR_FLAG marks an error frame
        const ERR_FLAG = 1 << 29;
        /// RTR_FLAG remote transmission request flag
        const RTR_FLAG = 1 << 30;
        /// EFF_FLAG indicates 29 bit extended identifier format
        const EFF_FLAG = 1 << 31;
    }
}

/// valid bits of a 29 bit extended identifier
pub const ID_MASK: u32 = (1 << 29) - 1;
/// valid bits of an 11 bit standard identifier
pub const SFF_MASK: u32 = (1 << 11) - 1;

/// CAN identifier plus flag bits, packed into a single 32 bit word.
/// Bit layout is a wire compatibility contract: id occupies bits 0..=28,
/// the error flag bit 29, RTR bit 30 and the extended flag bit 31.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug)]
pub struct CanHeader {
    raw: u32,
}

impl CanHeader {
    /// Construction never fails: an identifier too wide for its flag
    /// combination simply yields a header for which `is_valid()` is false.
    pub fn new(id: CanId, extended: bool, rtr: bool, error: bool) -> Self {
        let mut raw = id & ID_MASK;
        if error {
            raw |= HeaderFlags::ERR_FLAG.bits();
        }
        if rtr {
            raw |= HeaderFlags::RTR_FLAG.bits();
        }
        if extended {
            raw |= HeaderFlags::EFF_FLAG.bits();
        }
        CanHeader { raw }
    }

    /// standard 11 bit identifier header
    pub fn standard(id: CanId, rtr: bool) -> Self {
        Self::new(id, false, rtr, false)
    }

    /// extended 29 bit identifier header
    pub fn extended(id: CanId, rtr: bool) -> Self {
        Self::new(id, true, rtr, false)
    }

    /// error frame header
    pub fn error(id: CanId) -> Self {
        Self::new(id, false, false, true)
    }

    pub fn id(&self) -> CanId {
        self.raw & ID_MASK
    }

    pub fn is_error(&self) -> bool {
        self.raw & HeaderFlags::ERR_FLAG.bits() != 0
    }

    pub fn is_rtr(&self) -> bool {
        self.raw & HeaderFlags::RTR_FLAG.bits() != 0
    }

    pub fn is_extended(&self) -> bool {
        self.raw & HeaderFlags::EFF_FLAG.bits() != 0
    }

    /// check whether the identifier fits its advertised width
    pub fn is_valid(&self) -> bool {
        self.id() < if self.is_extended() { 1 << 29 } else { 1 << 11 }
    }

    /// identifier with all flag bits folded in, unique across header kinds
    pub fn fullid(&self) -> u32 {
        self.raw
    }

    /// canonical dispatch key: error frames all funnel to the error tag
    pub fn key(&self) -> u32 {
        if self.is_error() {
            HeaderFlags::ERR_FLAG.bits()
        } else {
            self.raw
        }
    }
}

/// A CAN 2.0 frame: header plus up to 8 payload bytes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct CanFrame {
    header: CanHeader,
    dlc: u8,
    data: [u8; 8],
}

impl CanFrame {
    /// empty frame for the given header
    pub fn new(header: CanHeader) -> Self {
        CanFrame { header, dlc: 0, data: [0u8; 8] }
    }

    /// frame carrying a copy of `data`, truncated to 8 bytes
    pub fn with_data(header: CanHeader, data: &[u8]) -> Self {
        let dlc = data.len().min(8);
        let mut bytes = [0u8; 8];
        bytes[..dlc].copy_from_slice(&data[..dlc]);
        CanFrame { header, dlc: dlc as u8, data: bytes }
    }

    pub fn header(&self) -> &CanHeader {
        &self.header
    }

    pub fn dlc(&self) -> u8 {
        self.dlc
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..self.dlc as usize]
    }

    /// frame is valid when both its length and its header are
    pub fn is_valid(&self) -> bool {
        self.dlc <= 8 && self.header.is_valid()
    }
}

impl std::ops::Deref for CanFrame {
    type Target = CanHeader;

    fn deref(&self) -> &CanHeader {
        &self.header
    }
}

impl From<CanHeader> for CanFrame {
    fn from(header: CanHeader) -> Self {
        CanFrame::new(header)
    }
}
