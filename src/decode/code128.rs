//! Code 128 scanline reader.

use super::reader::BarcodeReader;
use super::scanline::{pattern_variance, row, sweep_rows, Runs};
use crate::capture::Symbology;
use image::GrayImage;

/// Bar/space module widths for symbol values 0..=105 (106 is the stop
/// pattern, which has a seventh bar).
pub(crate) const PATTERNS: [[u8; 6]; 107] = [
    [2, 1, 2, 2, 2, 2], [2, 2, 2, 1, 2, 2], [2, 2, 2, 2, 2, 1], [1, 2, 1, 2, 2, 3],
    [1, 2, 1, 3, 2, 2], [1, 3, 1, 2, 2, 2], [1, 2, 2, 2, 1, 3], [1, 2, 2, 3, 1, 2],
    [1, 3, 2, 2, 1, 2], [2, 2, 1, 2, 1, 3], [2, 2, 1, 3, 1, 2], [2, 3, 1, 2, 1, 2],
    [1, 1, 2, 2, 3, 2], [1, 2, 2, 1, 3, 2], [1, 2, 2, 2, 3, 1], [1, 1, 3, 2, 2, 2],
    [1, 2, 3, 1, 2, 2], [1, 2, 3, 2, 2, 1], [2, 2, 3, 2, 1, 1], [2, 2, 1, 1, 3, 2],
    [2, 2, 1, 2, 3, 1], [2, 1, 3, 2, 1, 2], [2, 2, 3, 1, 1, 2], [3, 1, 2, 1, 3, 1],
    [3, 1, 1, 2, 2, 2], [3, 2, 1, 1, 2, 2], [3, 2, 1, 2, 2, 1], [3, 1, 2, 2, 1, 2],
    [3, 2, 2, 1, 1, 2], [3, 2, 2, 2, 1, 1], [2, 1, 2, 1, 2, 3], [2, 1, 2, 3, 2, 1],
    [2, 3, 2, 1, 2, 1], [1, 1, 1, 3, 2, 3], [1, 3, 1, 1, 2, 3], [1, 3, 1, 3, 2, 1],
    [1, 1, 2, 3, 1, 3], [1, 3, 2, 1, 1, 3], [1, 3, 2, 3, 1, 1], [2, 1, 1, 3, 1, 3],
    [2, 3, 1, 1, 1, 3], [2, 3, 1, 3, 1, 1], [1, 1, 2, 1, 3, 3], [1, 1, 2, 3, 3, 1],
    [1, 3, 2, 1, 3, 1], [1, 1, 3, 1, 2, 3], [1, 1, 3, 3, 2, 1], [1, 3, 3, 1, 2, 1],
    [3, 1, 3, 1, 2, 1], [2, 1, 1, 3, 3, 1], [2, 3, 1, 1, 3, 1], [2, 1, 3, 1, 1, 3],
    [2, 1, 3, 3, 1, 1], [2, 1, 3, 1, 3, 1], [3, 1, 1, 1, 2, 3], [3, 1, 1, 3, 2, 1],
    [3, 3, 1, 1, 2, 1], [3, 1, 2, 1, 1, 3], [3, 1, 2, 3, 1, 1], [3, 3, 2, 1, 1, 1],
    [3, 1, 4, 1, 1, 1], [2, 2, 1, 4, 1, 1], [4, 3, 1, 1, 1, 1], [1, 1, 1, 2, 2, 4],
    [1, 1, 1, 4, 2, 2], [1, 2, 1, 1, 2, 4], [1, 2, 1, 4, 2, 1], [1, 4, 1, 1, 2, 2],
    [1, 4, 1, 2, 2, 1], [1, 1, 2, 2, 1, 4], [1, 1, 2, 4, 1, 2], [1, 2, 2, 1, 1, 4],
    [1, 2, 2, 4, 1, 1], [1, 4, 2, 1, 1, 2], [1, 4, 2, 2, 1, 1], [2, 4, 1, 2, 1, 1],
    [2, 2, 1, 1, 1, 4], [4, 1, 3, 1, 1, 1], [2, 4, 1, 1, 1, 2], [1, 3, 4, 1, 1, 1],
    [1, 1, 1, 2, 4, 2], [1, 2, 1, 1, 4, 2], [1, 2, 1, 2, 4, 1], [1, 1, 4, 2, 1, 2],
    [1, 2, 4, 1, 1, 2], [1, 2, 4, 2, 1, 1], [4, 1, 1, 2, 1, 2], [4, 2, 1, 1, 1, 2],
    [4, 2, 1, 2, 1, 1], [2, 1, 2, 1, 4, 1], [2, 1, 4, 1, 2, 1], [4, 1, 2, 1, 2, 1],
    [1, 1, 1, 1, 4, 3], [1, 1, 1, 3, 4, 1], [1, 3, 1, 1, 4, 1], [1, 1, 4, 1, 1, 3],
    [1, 1, 4, 3, 1, 1], [4, 1, 1, 1, 1, 3], [4, 1, 1, 3, 1, 1], [1, 1, 3, 1, 4, 1],
    [1, 1, 4, 1, 3, 1], [3, 1, 1, 1, 4, 1], [4, 1, 1, 1, 3, 1], [2, 1, 1, 4, 1, 2],
    [2, 1, 1, 2, 1, 4], [2, 1, 1, 2, 3, 2], [2, 3, 3, 1, 1, 1],
];

/// Final bar of the stop pattern, in modules.
pub(crate) const STOP_TAIL: u8 = 2;

pub(crate) const START_A: u8 = 103;
pub(crate) const START_B: u8 = 104;
pub(crate) const START_C: u8 = 105;
pub(crate) const STOP: u8 = 106;

const CODE_SHIFT: u8 = 98;
const CODE_C: u8 = 99;
const CODE_B: u8 = 100;
const CODE_A: u8 = 101;
const FNC_1: u8 = 102;
const FNC_2: u8 = 97;
const FNC_3: u8 = 96;

const MAX_AVG_VARIANCE: f32 = 0.25;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

/// Reads Code 128 symbols along horizontal scanlines.
#[derive(Debug, Clone)]
pub struct Code128Reader {
    rows: u32,
    threshold: u8,
}

impl Code128Reader {
    /// Creates a reader sweeping `rows` scanlines with the given ink threshold.
    pub fn new(rows: u32, threshold: u8) -> Self {
        Self { rows, threshold }
    }

    /// Decodes the first symbol found in one set of runs.
    fn decode_runs(&self, runs: &Runs) -> Option<String> {
        let lengths = runs.lengths();
        // Quiet zone of at least half the start pattern's width.
        let quiet = |i: usize| {
            if i + 6 <= lengths.len() {
                runs.width(i, 6) / 2
            } else {
                u32::MAX
            }
        };
        runs.bar_starts(quiet)
            .find_map(|start| decode_from(lengths, start))
    }
}

impl Default for Code128Reader {
    fn default() -> Self {
        Self::new(9, 128)
    }
}

impl BarcodeReader for Code128Reader {
    fn format(&self) -> Symbology {
        Symbology::Code128
    }

    fn read(&self, luma: &GrayImage) -> Option<String> {
        sweep_rows(luma.height(), self.rows).into_iter().find_map(|y| {
            let runs = Runs::from_row(row(luma, y), self.threshold);
            self.decode_runs(&runs)
                .or_else(|| self.decode_runs(&runs.reversed()))
        })
    }
}

/// Best matching symbol value for six runs, searching `candidates`.
fn match_symbol(counters: &[u32], candidates: std::ops::RangeInclusive<u8>) -> Option<u8> {
    candidates
        .filter_map(|code| {
            pattern_variance(counters, &PATTERNS[code as usize], MAX_INDIVIDUAL_VARIANCE)
                .map(|variance| (code, variance))
        })
        .filter(|(_, variance)| *variance < MAX_AVG_VARIANCE)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(code, _)| code)
}

fn decode_from(lengths: &[u32], start: usize) -> Option<String> {
    if start + 6 > lengths.len() {
        return None;
    }
    let start_code = match_symbol(&lengths[start..start + 6], START_A..=START_C)?;
    let mut codes = vec![start_code];
    let mut pos = start + 6;

    loop {
        if pos + 6 > lengths.len() {
            return None;
        }
        let code = match_symbol(&lengths[pos..pos + 6], 0..=STOP)?;
        pos += 6;
        match code {
            STOP => break,
            START_A..=START_C => return None,
            _ => codes.push(code),
        }
    }

    // Stop tail bar must be present.
    let tail = *lengths.get(pos)?;
    if tail == 0 {
        return None;
    }

    // Start, at least one data symbol, and the checksum.
    if codes.len() < 3 {
        return None;
    }
    let checksum = codes.pop()?;
    let weighted = codes
        .iter()
        .enumerate()
        .map(|(i, &code)| i.max(1) as u32 * code as u32)
        .sum::<u32>();
    if weighted % 103 != checksum as u32 {
        tracing::trace!(expected = checksum, "Code 128 checksum mismatch");
        return None;
    }

    interpret(&codes)
}

/// Turns symbol values (start code first, checksum removed) into text.
fn interpret(codes: &[u8]) -> Option<String> {
    let mut set = match codes.first()? {
        &START_A => CodeSet::A,
        &START_B => CodeSet::B,
        _ => CodeSet::C,
    };
    let mut text = String::new();
    let mut shifted = false;

    for &code in &codes[1..] {
        let active = if shifted {
            shifted = false;
            match set {
                CodeSet::A => CodeSet::B,
                CodeSet::B => CodeSet::A,
                CodeSet::C => CodeSet::C,
            }
        } else {
            set
        };

        match active {
            CodeSet::A | CodeSet::B => match code {
                0..=63 => text.push((code + 32) as char),
                64..=95 if active == CodeSet::A => text.push((code - 64) as char),
                64..=95 => text.push((code + 32) as char),
                FNC_1 | FNC_2 | FNC_3 => {}
                CODE_SHIFT => shifted = true,
                CODE_C => set = CodeSet::C,
                CODE_B if active == CodeSet::A => set = CodeSet::B,
                CODE_A if active == CodeSet::B => set = CodeSet::A,
                // FNC4 in the current set.
                CODE_B | CODE_A => {}
                _ => return None,
            },
            CodeSet::C => match code {
                0..=99 => {
                    text.push((b'0' + code / 10) as char);
                    text.push((b'0' + code % 10) as char);
                }
                CODE_B => set = CodeSet::B,
                CODE_A => set = CodeSet::A,
                FNC_1 => {}
                _ => return None,
            },
        }
    }
    Some(text)
}
