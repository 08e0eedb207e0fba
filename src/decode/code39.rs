//! Code 39 scanline reader.

use super::reader::BarcodeReader;
use super::scanline::{row, sweep_rows, Runs};
use crate::capture::Symbology;
use image::GrayImage;

pub(crate) const ALPHABET: &[u8; 43] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%";

/// Wide/narrow flags for each character in [`ALPHABET`], first element in
/// the most significant of nine bits.
pub(crate) const ENCODINGS: [u16; 43] = [
    0x034, 0x121, 0x061, 0x160, 0x031, 0x130, 0x070, 0x025, 0x124, 0x064, // 0-9
    0x109, 0x049, 0x148, 0x019, 0x118, 0x058, 0x00D, 0x10C, 0x04C, 0x01C, // A-J
    0x103, 0x043, 0x142, 0x013, 0x112, 0x052, 0x007, 0x106, 0x046, 0x016, // K-T
    0x181, 0x0C1, 0x1C0, 0x091, 0x190, 0x0D0, 0x085, 0x184, 0x0C4, 0x0A8, // U-$
    0x0A2, 0x08A, 0x02A, // /-%
];

/// The `*` start/stop character.
pub(crate) const ASTERISK: u16 = 0x094;

const ELEMENTS: usize = 9;

/// Reads Code 39 symbols along horizontal scanlines.
#[derive(Debug, Clone)]
pub struct Code39Reader {
    rows: u32,
    threshold: u8,
}

impl Code39Reader {
    /// Creates a reader sweeping `rows` scanlines with the given ink threshold.
    pub fn new(rows: u32, threshold: u8) -> Self {
        Self { rows, threshold }
    }

    fn decode_runs(&self, runs: &Runs) -> Option<String> {
        let lengths = runs.lengths();
        let quiet = |i: usize| {
            if i + ELEMENTS <= lengths.len() {
                runs.width(i, ELEMENTS) / 2
            } else {
                u32::MAX
            }
        };
        runs.bar_starts(quiet)
            .find_map(|start| decode_from(lengths, start))
    }
}

impl Default for Code39Reader {
    fn default() -> Self {
        Self::new(9, 128)
    }
}

impl BarcodeReader for Code39Reader {
    fn format(&self) -> Symbology {
        Symbology::Code39
    }

    fn read(&self, luma: &GrayImage) -> Option<String> {
        sweep_rows(luma.height(), self.rows).into_iter().find_map(|y| {
            let runs = Runs::from_row(row(luma, y), self.threshold);
            self.decode_runs(&runs)
                .or_else(|| self.decode_runs(&runs.reversed()))
        })
    }
}

/// Classifies nine element widths as wide or narrow.
///
/// Raises the narrow ceiling until exactly three elements remain above
/// it; `None` if no ceiling splits them three to six.
fn wide_narrow(counters: &[u32]) -> Option<u16> {
    let mut ceiling = 0u32;
    loop {
        let next = counters.iter().copied().filter(|&c| c > ceiling).min()?;
        ceiling = next;
        let wide = counters.iter().filter(|&&c| c > ceiling).count();
        if wide < 3 {
            return None;
        }
        if wide == 3 {
            let mut pattern = 0u16;
            for (i, &c) in counters.iter().enumerate() {
                if c > ceiling {
                    pattern |= 1 << (ELEMENTS - 1 - i);
                }
            }
            return Some(pattern);
        }
    }
}

fn lookup(pattern: u16) -> Option<char> {
    ENCODINGS
        .iter()
        .position(|&e| e == pattern)
        .map(|i| ALPHABET[i] as char)
}

/// Widest inter-character gap accepted, in modules, for a character
/// `width` pixels wide. A character spans fifteen modules at a 3:1 ratio.
fn gap_fits(gap: u32, width: u32) -> bool {
    gap * 15 <= width * 2
}

fn decode_from(lengths: &[u32], start: usize) -> Option<String> {
    if start + ELEMENTS > lengths.len() {
        return None;
    }
    if wide_narrow(&lengths[start..start + ELEMENTS])? != ASTERISK {
        return None;
    }
    let mut text = String::new();
    let mut pos = start + ELEMENTS;

    loop {
        // Inter-character gap, then the next character.
        let gap = *lengths.get(pos)?;
        let previous = lengths[pos - ELEMENTS..pos].iter().sum::<u32>();
        if !gap_fits(gap, previous) {
            return None;
        }
        pos += 1;
        if pos + ELEMENTS > lengths.len() {
            return None;
        }
        let pattern = wide_narrow(&lengths[pos..pos + ELEMENTS])?;
        pos += ELEMENTS;
        if pattern == ASTERISK {
            break;
        }
        text.push(lookup(pattern)?);
    }

    // The stop character needs a trailing quiet zone of half its width.
    let stop_width: u32 = lengths[pos - ELEMENTS..pos].iter().sum();
    let trailing = *lengths.get(pos)?;
    if trailing < stop_width / 2 {
        return None;
    }

    (!text.is_empty()).then_some(text)
}
