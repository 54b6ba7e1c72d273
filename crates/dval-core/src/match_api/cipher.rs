//! Reversible shift cipher applied to patient sequence numbers before they
//! leave MATCH. Digits rotate mod 10, ASCII letters mod 26 within their case;
//! anything else is passed through.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("empty identifier")]
    Empty,
}

#[derive(Debug, Clone, Copy)]
pub struct SimpleCipher {
    key: i64,
}

impl SimpleCipher {
    pub fn new(key: i64) -> Self {
        Self { key }
    }

    pub fn cipher(&self, plain: &str) -> Result<String, CipherError> {
        self.apply(plain, self.key)
    }

    pub fn decipher(&self, ciphered: &str) -> Result<String, CipherError> {
        self.apply(ciphered, -self.key)
    }

    fn apply(&self, text: &str, by: i64) -> Result<String, CipherError> {
        if text.is_empty() {
            return Err(CipherError::Empty);
        }
        Ok(text.chars().map(|c| shift_char(c, by)).collect())
    }
}

fn shift_char(c: char, by: i64) -> char {
    let (base, modulus) = match c {
        '0'..='9' => (b'0', 10),
        'A'..='Z' => (b'A', 26),
        'a'..='z' => (b'a', 26),
        _ => return c,
    };
    let offset = (c as u8 - base) as i64;
    let shifted = (offset + by).rem_euclid(modulus);
    (base + shifted as u8) as char
}
