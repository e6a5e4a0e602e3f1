//! `EKM1` keyboard layout file format parser and PS/2 scancode routing
//! (spec §6). Table shapes are grounded on
//! `original_source/kernel/include/drivers/input/Keyboard.h`'s
//! `KEY_LAYOUT_HID` model: up to 4 shift levels, 128 dead-key entries,
//! 256 compose entries.

use alloc::string::String;
use alloc::vec::Vec;
use heapless::Vec as HVec;
use spin::Mutex;

use crate::lib::error::KernelError;
use crate::util::list::FifoList;

pub const MAGIC: [u8; 4] = *b"EKM1";
pub const MAX_LEVELS: u8 = 4;
pub const MAX_DEAD_KEYS: usize = 128;
pub const MAX_COMPOSE: usize = 256;
pub const USAGE_MIN: u32 = 0x04;
pub const USAGE_MAX: u32 = 0xE7;

/// Hardware-sized scancode backlog, matching `KEYBOARDSTRUCT.Buffer`'s
/// `MAXKEYBUFFER` capacity.
const SCANCODE_BUFFER_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEntry {
    pub usage: u32,
    pub level: u8,
    pub vk: u8,
    pub ascii: u8,
    pub unicode: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadKeyEntry {
    pub dead: u32,
    pub base: u32,
    pub result: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeEntry {
    pub first: u32,
    pub second: u32,
    pub result: u32,
}

#[derive(Debug, Default)]
pub struct Layout {
    pub code: String,
    pub levels: u8,
    pub map: Vec<MapEntry>,
    pub dead_keys: HVec<DeadKeyEntry, MAX_DEAD_KEYS>,
    pub compose: HVec<ComposeEntry, MAX_COMPOSE>,
}

impl Layout {
    /// Looks up the mapped entry for `(usage, level)`, the operation
    /// `HandleKeyboardUsage` ultimately performs against the active table.
    pub fn lookup(&self, usage: u32, level: u8) -> Option<&MapEntry> {
        self.map.iter().find(|e| e.usage == usage && e.level == level)
    }
}

/// Parses an `EKM1` layout file. Tolerant UTF-8 decoding: invalid byte
/// sequences become the replacement character rather than failing.
pub fn parse(bytes: &[u8]) -> Result<Layout, KernelError> {
    if bytes.len() < 4 || bytes[..4] != MAGIC {
        return Err(KernelError::InvalidArgument);
    }

    let text = String::from_utf8_lossy(&bytes[4..]).into_owned();
    let mut layout = Layout::default();
    let mut code_set = false;
    let mut seen: Vec<(u32, u8)> = Vec::new();

    for raw_line in text.lines() {
        let no_comment = match raw_line.split_once('#') {
            Some((before, _)) => before,
            None => raw_line,
        };
        let line = no_comment.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split_whitespace();
        let directive = parts.next().unwrap_or("");

        match directive {
            "code" => {
                if code_set {
                    return Err(KernelError::InvalidArgument);
                }
                let ident = parts.next().ok_or(KernelError::InvalidArgument)?;
                layout.code = String::from(ident);
                code_set = true;
            }
            "levels" => {
                let n: u8 = parts
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or(KernelError::InvalidArgument)?;
                if n == 0 || n > MAX_LEVELS {
                    return Err(KernelError::InvalidArgument);
                }
                layout.levels = n;
            }
            "map" => {
                let usage = parse_hex(parts.next())?;
                let level: u8 = parts
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or(KernelError::InvalidArgument)?;
                let vk = parse_hex(parts.next())?;
                let ascii = parse_hex(parts.next())?;
                let unicode = parse_hex(parts.next())?;

                if !(USAGE_MIN..=USAGE_MAX).contains(&usage)
                    || vk > 0xFF
                    || ascii > 0xFF
                    || unicode > 0xFFFF
                {
                    return Err(KernelError::InvalidArgument);
                }
                if seen.contains(&(usage, level)) {
                    return Err(KernelError::InvalidArgument);
                }
                seen.push((usage, level));

                layout.map.push(MapEntry {
                    usage,
                    level,
                    vk: vk as u8,
                    ascii: ascii as u8,
                    unicode: unicode as u16,
                });
            }
            "dead" => {
                let dead = parse_hex(parts.next())?;
                let base = parse_hex(parts.next())?;
                let result = parse_hex(parts.next())?;
                layout
                    .dead_keys
                    .push(DeadKeyEntry { dead, base, result })
                    .map_err(|_| KernelError::OutOfMemory)?;
            }
            "compose" => {
                let first = parse_hex(parts.next())?;
                let second = parse_hex(parts.next())?;
                let result = parse_hex(parts.next())?;
                layout
                    .compose
                    .push(ComposeEntry { first, second, result })
                    .map_err(|_| KernelError::OutOfMemory)?;
            }
            _ => return Err(KernelError::InvalidArgument),
        }
    }

    if !code_set {
        return Err(KernelError::InvalidArgument);
    }

    Ok(layout)
}

fn parse_hex(tok: Option<&str>) -> Result<u32, KernelError> {
    let tok = tok.ok_or(KernelError::InvalidArgument)?;
    let tok = tok.strip_prefix("0x").unwrap_or(tok);
    u32::from_str_radix(tok, 16).map_err(|_| KernelError::InvalidArgument)
}

static SCANCODES: Mutex<FifoList<u8>> = Mutex::new(FifoList::new());

/// Called from the keyboard IRQ top half. Drops the oldest byte rather
/// than growing without bound once `SCANCODE_BUFFER_CAPACITY` is hit,
/// matching the fixed-size `KEYBOARDSTRUCT.Buffer`.
pub fn feed_scancode(scancode: u8) {
    let mut buf = SCANCODES.lock();
    if buf.len() >= SCANCODE_BUFFER_CAPACITY {
        buf.pop_front();
    }
    buf.push_back(scancode);
}

/// `PeekChar` equivalent: true if a scancode is queued, without consuming it.
pub fn has_pending() -> bool {
    !SCANCODES.lock().is_empty()
}

/// `GetChar`/`GetKeyCode` equivalent: consumes the next queued scancode.
pub fn next_scancode() -> Option<u8> {
    SCANCODES.lock().pop_front()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_magic() {
        assert!(parse(b"XXXXcode en-US\n").is_err());
    }

    #[test]
    fn parses_minimal_layout() {
        let data = b"EKM1code en-US\nlevels 2\nmap 0x04 0 0x1E 0x61 0x0061\n# comment\n";
        let layout = parse(data).unwrap();
        assert_eq!(layout.code, "en-US");
        assert_eq!(layout.levels, 2);
        assert_eq!(layout.map.len(), 1);
        assert_eq!(layout.lookup(0x04, 0).unwrap().ascii, 0x61);
    }

    #[test]
    fn rejects_duplicate_usage_level() {
        let data = b"EKM1code en-US\nmap 0x04 0 0x1E 0x61 0x0061\nmap 0x04 0 0x1E 0x62 0x0062\n";
        assert!(parse(data).is_err());
    }

    #[test]
    fn dead_and_compose_entries_parse() {
        let data = b"EKM1code fr-FR\ndead 0x5E 0x61 0xE2\ncompose 0x60 0x61 0xE0\n";
        let layout = parse(data).unwrap();
        assert_eq!(layout.dead_keys.len(), 1);
        assert_eq!(layout.compose.len(), 1);
        assert_eq!(layout.dead_keys[0].result, 0xE2);
    }

    #[test]
    fn scancode_buffer_is_fifo() {
        feed_scancode(0x1E);
        feed_scancode(0x1F);
        assert!(has_pending());
        assert_eq!(next_scancode(), Some(0x1E));
        assert_eq!(next_scancode(), Some(0x1F));
    }
}
