/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * Redpesk interface code/config use MIT License and can be freely copy/modified even within proprietary code
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 *
 * Trace text convention: "<hex-id>#<hex-payload>", one frame per line,
 * as produced by the usual candump style tooling.
*/
use crate::frame::{CanFrame, CanHeader, HeaderFlags, ID_MASK};
use crate::utils::CanError;
use std::fmt;

/// Decode one hex digit, `None` for anything outside 0-9a-fA-F.
pub fn hex_to_nibble(digit: char) -> Option<u8> {
    match digit {
        '0'..='9' => Some(digit as u8 - b'0'),
        'a'..='f' => Some(digit as u8 - b'a' + 10),
        'A'..='F' => Some(digit as u8 - b'A' + 10),
        _ => None,
    }
}

/// Decode a hex string into bytes. An odd length input is left padded with
/// one '0' nibble when `pad` is set, refused otherwise.
pub fn hex_to_bytes(text: &str, pad: bool) -> Result<Vec<u8>, CanError> {
    let mut nibbles: Vec<u8> = Vec::with_capacity(text.len() + 1);

    if text.len() % 2 != 0 {
        if pad {
            nibbles.push(0);
        } else {
            return Err(CanError::new(
                "hex-odd-length",
                format!("'{text}' has odd length and padding is disabled"),
            ));
        }
    }

    for digit in text.chars() {
        match hex_to_nibble(digit) {
            Some(value) => nibbles.push(value),
            None => {
                return Err(CanError::new(
                    "hex-invalid-digit",
                    format!("'{digit}' is not a hex digit"),
                ))
            }
        }
    }

    Ok(nibbles.chunks_exact(2).map(|pair| (pair[0] << 4) | pair[1]).collect())
}

/// Encode one byte; the leading nibble is omitted only when it is zero and
/// `two_digits` is false.
pub fn byte_to_hex(byte: u8, two_digits: bool, lowercase: bool) -> String {
    let text = if lowercase { format!("{byte:x}") } else { format!("{byte:X}") };
    if two_digits && byte < 0x10 {
        format!("0{text}")
    } else {
        text
    }
}

/// Encode a full buffer, every byte forced to two digits.
pub fn bytes_to_hex(bytes: &[u8], lowercase: bool) -> String {
    bytes.iter().map(|byte| byte_to_hex(*byte, true, lowercase)).collect()
}

/// Parse a leading hex run into a u32: 0 when nothing parses, saturating
/// to `u32::MAX` on overflow (stream extraction semantics).
pub fn hex_to_u32(text: &str) -> u32 {
    let end = text.find(|c: char| !c.is_ascii_hexdigit()).unwrap_or(text.len());
    match u32::from_str_radix(&text[..end], 16) {
        Ok(value) => value,
        Err(_) if end == 0 => 0,
        Err(_) => u32::MAX,
    }
}

/// Render a header in trace notation: extended headers zero padded to 8
/// digits, standard headers with minimal digits. The extended flag bit is
/// stripped, the padding carries that information.
pub fn header_to_string(header: &CanHeader, lowercase: bool) -> String {
    let id = header.fullid() & !HeaderFlags::EFF_FLAG.bits();
    match (header.is_extended(), lowercase) {
        (true, true) => format!("{id:08x}"),
        (true, false) => format!("{id:08X}"),
        (false, true) => format!("{id:x}"),
        (false, false) => format!("{id:X}"),
    }
}

/// Parse a header from trace notation. A text of exactly 8 digits whose id
/// does not fit 11 bits is treated as extended even without an explicit
/// flag bit; downstream format compatibility depends on this rule.
pub fn header_from_string(text: &str) -> CanHeader {
    let raw = hex_to_u32(text);
    let id = raw & ID_MASK;
    CanHeader::new(
        id,
        raw & HeaderFlags::EFF_FLAG.bits() != 0 || (text.len() == 8 && id >= (1 << 11)),
        raw & HeaderFlags::RTR_FLAG.bits() != 0,
        raw & HeaderFlags::ERR_FLAG.bits() != 0,
    )
}

/// Render a frame as "<hex-id>#<hex-payload>".
pub fn frame_to_string(frame: &CanFrame, lowercase: bool) -> String {
    format!(
        "{}#{}",
        header_to_string(frame.header(), lowercase),
        bytes_to_hex(frame.data(), lowercase)
    )
}

/// Parse a frame from trace notation. A missing '#' or a payload longer
/// than 8 bytes yields the sentinel invalid frame (standard id 0xfff); an
/// invalid header or undecodable payload leaves the frame empty.
pub fn frame_from_string(text: &str) -> CanFrame {
    let sep = match text.find('#') {
        Some(sep) => sep,
        None => return CanFrame::new(CanHeader::standard(0xfff, false)),
    };

    let header = header_from_string(&text[..sep]);
    if header.is_valid() {
        if let Ok(buffer) = hex_to_bytes(&text[sep + 1..], false) {
            if buffer.len() > 8 {
                return CanFrame::new(CanHeader::standard(0xfff, false));
            }
            return CanFrame::with_data(header, &buffer);
        }
    }
    CanFrame::new(header)
}

impl fmt::Display for CanHeader {
    fn fmt(&self, format: &mut fmt::Formatter) -> fmt::Result {
        write!(format, "{}", header_to_string(self, true))
    }
}

impl fmt::Display for CanFrame {
    fn fmt(&self, format: &mut fmt::Formatter) -> fmt::Result {
        write!(format, "{}", frame_to_string(self, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::CanHeader;

    #[test]
    fn nibble_decoding() {
        assert_eq!(hex_to_nibble('0'), Some(0));
        assert_eq!(hex_to_nibble('a'), Some(10));
        assert_eq!(hex_to_nibble('F'), Some(15));
        assert_eq!(hex_to_nibble('g'), None);
        assert_eq!(hex_to_nibble('#'), None);
    }

    #[test]
    fn hex_buffer_decoding() {
        assert_eq!(hex_to_bytes("deadBEEF", false).unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(hex_to_bytes("", false).unwrap(), Vec::<u8>::new());
        // odd length pads to a leading zero nibble when requested
        assert_eq!(hex_to_bytes("fff", true).unwrap(), vec![0x0f, 0xff]);
        assert!(hex_to_bytes("fff", false).is_err());
        assert!(hex_to_bytes("zz", true).is_err());
    }

    #[test]
    fn hex_run_parsing() {
        assert_eq!(hex_to_u32("1a3"), 0x1a3);
        assert_eq!(hex_to_u32("1a3xyz"), 0x1a3);
        assert_eq!(hex_to_u32(""), 0);
        assert_eq!(hex_to_u32("zz"), 0);
        // more than 8 digits saturates instead of dropping to 0
        assert_eq!(hex_to_u32("1FFFFFFFF"), u32::MAX);
    }

    #[test]
    fn byte_encoding() {
        assert_eq!(byte_to_hex(0x0a, false, true), "a");
        assert_eq!(byte_to_hex(0x0a, true, true), "0a");
        assert_eq!(byte_to_hex(0xab, false, false), "AB");
        assert_eq!(bytes_to_hex(&[0x01, 0xff], true), "01ff");
    }

    #[test]
    fn buffer_roundtrip() {
        let buffer = vec![0x00, 0x12, 0xfe, 0x07];
        assert_eq!(hex_to_bytes(&bytes_to_hex(&buffer, true), false).unwrap(), buffer);
    }

    #[test]
    fn header_rendering() {
        assert_eq!(header_to_string(&CanHeader::standard(0x1a3, false), false), "1A3");
        assert_eq!(header_to_string(&CanHeader::standard(0x1a3, false), true), "1a3");
        assert_eq!(header_to_string(&CanHeader::extended(0x1a3, false), true), "000001a3");
    }

    #[test]
    fn header_roundtrip() {
        for header in [
            CanHeader::standard(0x0, false),
            CanHeader::standard(0x7ff, false),
            CanHeader::extended(0x800, false),
            CanHeader::extended(0x1fffffff, false),
            CanHeader::extended(0x1000, true),
        ] {
            let text = header_to_string(&header, true);
            assert_eq!(header_from_string(&text), header, "roundtrip of '{text}'");
        }
    }

    #[test]
    fn extended_header_in_standard_range_degrades() {
        // the text format cannot carry the extended flag for an id that
        // fits 11 bits: rendering strips the flag bit and the 8 digit
        // rule only restores it for ids needing more than 11 bits
        let header = CanHeader::extended(0x7ff, false);
        let text = header_to_string(&header, true);
        assert_eq!(text, "000007ff");
        let parsed = header_from_string(&text);
        assert!(!parsed.is_extended());
        assert_eq!(parsed.id(), 0x7ff);
    }

    #[test]
    fn eight_digit_text_forces_extended() {
        // id below 2^11 with no flag bit: the 8 character heuristic still
        // applies only when the id needs more than 11 bits
        let header = header_from_string("000007FF");
        assert!(!header.is_extended());
        assert_eq!(header.id(), 0x7ff);

        let header = header_from_string("00000800");
        assert!(header.is_extended());
        assert_eq!(header.id(), 0x800);
    }

    #[test]
    fn standard_frame_decoding() {
        let frame = frame_from_string("1A3#DEADBEEF");
        assert!(frame.is_valid());
        assert!(!frame.is_extended());
        assert_eq!(frame.id(), 0x1a3);
        assert_eq!(frame.dlc(), 4);
        assert_eq!(frame.data(), &[0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn eight_digit_empty_payload_decoding() {
        let frame = frame_from_string("000007FF#");
        assert!(!frame.is_extended());
        assert_eq!(frame.id(), 0x7ff);
        assert_eq!(frame.dlc(), 0);
        assert!(frame.is_valid());
    }

    #[test]
    fn missing_separator_yields_sentinel() {
        let frame = frame_from_string("123");
        assert_eq!(frame.id(), 0xfff);
        assert!(!frame.is_extended());
        assert!(!frame.is_valid());
    }

    #[test]
    fn oversize_payload_yields_sentinel() {
        let frame = frame_from_string("123#112233445566778899");
        assert_eq!(frame.id(), 0xfff);
        assert!(!frame.is_valid());
    }

    #[test]
    fn undecodable_payload_leaves_frame_empty() {
        let frame = frame_from_string("123#xx");
        assert_eq!(frame.id(), 0x123);
        assert_eq!(frame.dlc(), 0);
    }

    #[test]
    fn frame_roundtrip() {
        for text in ["1a3#deadbeef", "0000278c#01", "7ff#", "00001234#0011223344556677"] {
            let frame = frame_from_string(text);
            assert!(frame.is_valid());
            assert_eq!(frame_to_string(&frame, true), text);
            assert_eq!(frame_from_string(&frame_to_string(&frame, true)), frame);
        }
    }

    #[test]
    fn display_uses_lowercase_trace_format() {
        let frame = frame_from_string("1A3#DEADBEEF");
        assert_eq!(format!("{frame}"), "1a3#deadbeef");
        assert_eq!(format!("{}", frame.header()), "1a3");
    }
}
