//! Run-length coding as used by the legacy `.icns` pixel formats.
//!
//! The encoded stream is a sequence of records, each introduced by one
//! control byte `b`:
//!
//! - `b < 0x80`: the next `b + 1` bytes are literal data.
//! - `b >= 0x80`: the next single byte repeats `b - 0x80 + 3` times.
//!
//! A repeat record can therefore only cover runs of 3 to 130 bytes, and a
//! literal record at most 128 bytes; longer stretches are split across
//! records.

use std::io::{self, Error, ErrorKind};

/// RLE-encodes the provided bytes.
pub fn encode(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::new();
    let mut literal: Vec<u8> = Vec::new();
    let mut index = 0;
    while index < input.len() {
        let value = input[index];
        let mut run = 1;
        while index + run < input.len() && input[index + run] == value {
            run += 1;
        }
        if run >= 3 {
            flush_literal(&mut output, &mut literal);
            let mut left = run;
            while left > 0 {
                // Keep every record in the representable 3..=130 range;
                // a plain min(left, 130) split could leave a 1-2 byte
                // remainder that no repeat record can express.
                let taken =
                    if left <= 130 { left } else { left.min(133) - 3 };
                output.push(0x80 + (taken as u8 - 3));
                output.push(value);
                left -= taken;
            }
        } else {
            if literal.len() + run > 128 {
                flush_literal(&mut output, &mut literal);
            }
            for _ in 0..run {
                literal.push(value);
            }
        }
        index += run;
    }
    flush_literal(&mut output, &mut literal);
    output
}

fn flush_literal(output: &mut Vec<u8>, literal: &mut Vec<u8>) {
    if literal.is_empty() {
        return;
    }
    output.push(literal.len() as u8 - 1);
    output.extend_from_slice(literal);
    literal.clear();
}

/// RLE-decodes the provided bytes.  Returns an error if a record claims
/// more bytes than the input holds.
pub fn decode(input: &[u8]) -> io::Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut pos = 0;
    while pos < input.len() {
        let control = input[pos];
        if control < 0x80 {
            let count = control as usize + 1;
            let start = pos + 1;
            let end = start + count;
            if end > input.len() {
                return Err(rle_error());
            }
            output.extend_from_slice(&input[start..end]);
            pos = end;
        } else {
            if pos + 1 >= input.len() {
                return Err(rle_error());
            }
            let value = input[pos + 1];
            let count = (control - 0x80) as usize + 3;
            output.resize(output.len() + count, value);
            pos += 2;
        }
    }
    Ok(output)
}

fn rle_error() -> Error {
    Error::new(ErrorKind::InvalidData, "invalid RLE-compressed data")
}
