//! Pair and price extraction from free text (OCR output, chat messages)

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::core::TradingPair;

/// Quotes recognised in concatenated symbols such as `BTCUSDT`
const KNOWN_QUOTES: [&str; 6] = ["USD", "USDT", "EUR", "GBP", "ETH", "BTC"];
const MIN_CODE_LEN: usize = 2;
const MAX_CODE_LEN: usize = 5;

/// First trading pair and first positive price found in `text`.
pub fn extract_pair_and_price(text: &str) -> (Option<TradingPair>, Option<Decimal>) {
    (extract_pair(text), extract_price(text))
}

/// `BASE/QUOTE` or `BASE-QUOTE` anywhere in the text wins over a
/// concatenated `BASEQUOTE` word.
pub fn extract_pair(text: &str) -> Option<TradingPair> {
    separated_pair(text).or_else(|| concatenated_pair(text))
}

pub fn extract_price(text: &str) -> Option<Decimal> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        // A number glued to a letter (`BTC20000.50`) only counts with a
        // fraction, and never takes thousands groups.
        let glued = i > 0 && bytes[i - 1].is_ascii_alphabetic();
        let (end, literal) = scan_number(text, i, !glued);
        if !glued || literal.contains('.') {
            if let Some(price) = Decimal::from_str(&literal).ok().filter(|p| *p > Decimal::ZERO) {
                return Some(price);
            }
        }
        i = end;
    }
    None
}

fn separated_pair(text: &str) -> Option<TradingPair> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_alphabetic() {
            i += 1;
            continue;
        }
        let start = i;
        i = letters_end(bytes, i, usize::MAX);
        if i - start < MIN_CODE_LEN {
            continue;
        }
        // long runs contribute only their last letters
        let base = &text[i - (i - start).min(MAX_CODE_LEN)..i];

        let sep = skip_whitespace(bytes, i);
        if sep >= bytes.len() || !matches!(bytes[sep], b'-' | b'/') {
            continue;
        }
        let quote_start = skip_whitespace(bytes, sep + 1);
        let quote_end = letters_end(bytes, quote_start, MAX_CODE_LEN);
        if quote_end - quote_start < MIN_CODE_LEN {
            continue;
        }

        if let Ok(pair) = TradingPair::new(base, &text[quote_start..quote_end]) {
            return Some(pair);
        }
    }
    None
}

fn concatenated_pair(text: &str) -> Option<TradingPair> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty() && word.bytes().all(|b| b.is_ascii_alphabetic()))
        .find_map(split_known_quote)
}

/// Longest base first, so `BTCUSDT` splits as `BTC/USDT`.
fn split_known_quote(word: &str) -> Option<TradingPair> {
    let word = word.to_ascii_uppercase();
    (MIN_CODE_LEN..=MAX_CODE_LEN).rev().find_map(|base_len| {
        if base_len >= word.len() {
            return None;
        }
        let (base, quote) = word.split_at(base_len);
        if !KNOWN_QUOTES.contains(&quote) {
            return None;
        }
        TradingPair::new(base, quote).ok()
    })
}

/// Reads one number starting at `start`: a digit run, `,`/space separated
/// groups of exactly three digits after a short leading run (when `grouped`),
/// then an optional fraction. Returns the end offset and the literal without
/// separators.
fn scan_number(text: &str, start: usize, grouped: bool) -> (usize, String) {
    let bytes = text.as_bytes();
    let mut i = digits_end(bytes, start);
    let mut literal = text[start..i].to_string();

    if grouped && i - start <= 3 {
        while i < bytes.len()
            && (bytes[i] == b',' || bytes[i].is_ascii_whitespace())
            && digits_end(bytes, i + 1) == i + 4
        {
            literal.push_str(&text[i + 1..i + 4]);
            i += 4;
        }
    }

    if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
        let end = digits_end(bytes, i + 1);
        literal.push_str(&text[i..end]);
        i = end;
    }
    (i, literal)
}

fn digits_end(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    i
}

fn letters_end(bytes: &[u8], from: usize, max_len: usize) -> usize {
    let mut i = from;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() && i - from < max_len {
        i += 1;
    }
    i
}

fn skip_whitespace(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}
