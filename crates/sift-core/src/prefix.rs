//! Radix-128 path encoding for materialized hierarchy prefixes.
//!
//! Every node stores `prefix = parent.prefix + encode(id)` and
//! `prefix_plus_one = parent.prefix + encode(id + 1)`. Because [`encode`] is
//! order-preserving and prefix-free, the half-open string range
//! `[prefix, prefix_plus_one)` holds exactly the node and its descendants,
//! so subtree queries become a single indexed range scan.
//!
//! Layout: one length character (the number of radix-128 digits, 1..=10)
//! followed by the digits, most significant first. Digit `d` is written as
//! the character with code point `d + 1`, which keeps NUL out of stored text.
//! UTF-8 byte order matches code point order, so byte-wise comparison in
//! SQLite agrees with `str` ordering.

/// Radix of the digit alphabet.
pub const RADIX: u64 = 128;

/// Digits needed for `u64::MAX` in radix 128.
pub const MAX_DIGITS: usize = 10;

const BITS_PER_DIGIT: u32 = 7;

/// Encode a node identifier as an order-preserving, prefix-free string.
pub fn encode(n: u64) -> String {
    let mut digits = [0u8; MAX_DIGITS];
    let mut len = 0;
    let mut rest = n;
    loop {
        digits[len] = (rest % RADIX) as u8;
        len += 1;
        rest >>= BITS_PER_DIGIT;
        if rest == 0 {
            break;
        }
    }

    let mut out = String::with_capacity(1 + len * 2);
    out.push(digit_char(len as u8));
    for &d in digits[..len].iter().rev() {
        out.push(digit_char(d + 1));
    }
    out
}

/// Decode a single encoded segment at the start of `s`.
/// Returns the value and the number of bytes consumed.
pub fn decode_segment(s: &str) -> Option<(u64, usize)> {
    let mut chars = s.char_indices();
    let (_, len_char) = chars.next()?;
    let len = len_char as u32 as usize;
    if len == 0 || len > MAX_DIGITS {
        return None;
    }

    let mut value: u64 = 0;
    let mut consumed = len_char.len_utf8();
    for _ in 0..len {
        let (_, c) = chars.next()?;
        let code = c as u32;
        if code == 0 || code > RADIX as u32 {
            return None;
        }
        value = value
            .checked_mul(RADIX)?
            .checked_add(u64::from(code - 1))?;
        consumed += c.len_utf8();
    }
    Some((value, consumed))
}

/// Decode a full materialized path into the chain of ancestor identifiers,
/// root first. Returns `None` if the path is malformed.
pub fn decode_path(path: &str) -> Option<Vec<u64>> {
    let mut ids = Vec::new();
    let mut rest = path;
    while !rest.is_empty() {
        let (id, used) = decode_segment(rest)?;
        ids.push(id);
        rest = &rest[used..];
    }
    Some(ids)
}

/// Prefix for a node with identifier `id` under a parent path.
pub fn child_prefix(parent_path: &str, id: u64) -> String {
    let mut prefix = String::with_capacity(parent_path.len() + 1 + MAX_DIGITS * 2);
    prefix.push_str(parent_path);
    prefix.push_str(&encode(id));
    prefix
}

/// Exclusive upper bound of the subtree rooted at `id` under a parent path.
/// Saturates at `u64::MAX`, which no allocator ever reaches.
pub fn child_prefix_plus_one(parent_path: &str, id: u64) -> String {
    child_prefix(parent_path, id.saturating_add(1))
}

fn digit_char(code: u8) -> char {
    // 1..=128 are all valid scalar values.
    char::from_u32(u32::from(code)).unwrap_or(char::MAX)
}
