//! Random bulk-transfer stop sentinel (spec §4.7, §6).
//!
//! The SS picks a random `STOP<0-999>` token at the start of every
//! bulk transfer and sends it as the first frame; a payload frame
//! byte-equal to the sentinel value terminates the stream. Randomizing
//! it per-transfer keeps a sentinel from ever being confused with file
//! content that happens to start with the literal bytes `STOP`.

use rand::Rng;

use crate::MAX_BUFFER_SIZE;

/// Generates a fresh `STOP<NNN>` sentinel, NUL-padded to a full bulk
/// frame (`MAX_BUFFER_SIZE` bytes).
pub fn generate() -> Vec<u8> {
    let n: u16 = rand::thread_rng().gen_range(0..1000);
    let token = format!("STOP{n}");
    let mut frame = vec![0u8; MAX_BUFFER_SIZE];
    frame[..token.len()].copy_from_slice(token.as_bytes());
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_matches_expected_shape() {
        for _ in 0..50 {
            let frame = generate();
            assert_eq!(frame.len(), MAX_BUFFER_SIZE);
            let end = frame.iter().position(|&b| b == 0).unwrap();
            let token = std::str::from_utf8(&frame[..end]).unwrap();
            assert!(token.starts_with("STOP"));
            let digits = &token[4..];
            assert!(!digits.is_empty() && digits.len() <= 3);
            assert!(digits.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
