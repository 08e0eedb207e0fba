//! Synthetic symbol images for reader and engine tests.

use super::code128::{PATTERNS, START_B, STOP, STOP_TAIL};
use super::code39::{ALPHABET, ASTERISK, ENCODINGS};
use image::{Rgba, RgbaImage};

pub const BLACK: [u8; 3] = [0, 0, 0];
pub const WHITE: [u8; 3] = [255, 255, 255];

const QUIET_MODULES: usize = 10;

fn push_elements(modules: &mut Vec<bool>, widths: impl IntoIterator<Item = usize>) {
    for (i, width) in widths.into_iter().enumerate() {
        let bar = i % 2 == 0;
        modules.extend(std::iter::repeat(bar).take(width));
    }
}

/// Module sequence (`true` = bar) for `text` in Code 128 set B.
pub fn code128_modules(text: &str) -> Vec<bool> {
    let mut codes = vec![START_B];
    codes.extend(text.bytes().map(|b| b - 32));
    let checksum = codes
        .iter()
        .enumerate()
        .map(|(i, &c)| i.max(1) as u32 * c as u32)
        .sum::<u32>()
        % 103;
    codes.push(checksum as u8);
    codes.push(STOP);

    let mut modules = vec![false; QUIET_MODULES];
    for code in codes {
        push_elements(
            &mut modules,
            PATTERNS[code as usize].iter().map(|&w| w as usize),
        );
    }
    modules.extend(std::iter::repeat(true).take(STOP_TAIL as usize));
    modules.extend(std::iter::repeat(false).take(QUIET_MODULES));
    modules
}

/// Module sequence for `text` in Code 39 with 3:1 wide elements.
pub fn code39_modules(text: &str) -> Vec<bool> {
    let mut patterns = vec![ASTERISK];
    for ch in text.bytes() {
        let index = ALPHABET
            .iter()
            .position(|&a| a == ch)
            .expect("character outside the Code 39 alphabet");
        patterns.push(ENCODINGS[index]);
    }
    patterns.push(ASTERISK);

    let mut modules = vec![false; QUIET_MODULES];
    for (n, pattern) in patterns.iter().enumerate() {
        if n > 0 {
            modules.push(false);
        }
        push_elements(
            &mut modules,
            (0..9).map(|i| if pattern & (1 << (8 - i)) != 0 { 3 } else { 1 }),
        );
    }
    modules.extend(std::iter::repeat(false).take(QUIET_MODULES));
    modules
}

/// Renders modules as vertical bars `module_px` wide.
pub fn linear_image(
    modules: &[bool],
    module_px: u32,
    height: u32,
    bar: [u8; 3],
    background: [u8; 3],
) -> RgbaImage {
    let width = modules.len() as u32 * module_px;
    RgbaImage::from_fn(width, height, |x, _| {
        let [r, g, b] = if modules[(x / module_px) as usize] {
            bar
        } else {
            background
        };
        Rgba([r, g, b, 255])
    })
}

/// Smooth colour gradient with no symbol in it.
pub fn plain_photo(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        Rgba([r, g, 180, 255])
    })
}
