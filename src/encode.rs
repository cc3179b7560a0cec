use crate::error::{Error, Result};

const B64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

pub fn from_hex(hex: &str) -> Result<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return Err(Error::InvalidHex(format!("odd length {}", hex.len())));
    }
    hex.as_bytes()
        .chunks_exact(2)
        .map(|pair| match (hex_digit(pair[0]), hex_digit(pair[1])) {
            (Some(hi), Some(lo)) => Ok(hi << 4 | lo),
            _ => Err(Error::InvalidHex(String::from_utf8_lossy(pair).into_owned())),
        })
        .collect()
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn b64_value(c: u8) -> Option<u32> {
    B64.iter().position(|&x| x == c).map(|v| v as u32)
}

/// Decodes standard base64, skipping ASCII whitespace so wrapped fixtures can
/// be passed as is.
pub fn from_base64(b64: &str) -> Result<Vec<u8>> {
    let chars: Vec<u8> = b64.bytes().filter(|c| !c.is_ascii_whitespace()).collect();
    if chars.len() % 4 != 0 {
        return Err(Error::InvalidBase64(format!("length {}", chars.len())));
    }
    let mut res = Vec::with_capacity(chars.len() / 4 * 3);
    let quads = chars.len() / 4;
    for (i, quad) in chars.chunks_exact(4).enumerate() {
        let pad = quad.iter().rev().take_while(|&&c| c == b'=').count();
        if pad > 2 || (pad > 0 && i + 1 != quads) {
            return Err(Error::InvalidBase64(String::from_utf8_lossy(quad).into_owned()));
        }
        let mut acc = 0u32;
        for &c in &quad[..4 - pad] {
            let v = b64_value(c)
                .ok_or_else(|| Error::InvalidBase64(format!("character {:?}", c as char)))?;
            acc = acc << 6 | v;
        }
        acc <<= 6 * pad as u32;
        res.extend(&acc.to_be_bytes()[1..4 - pad]);
    }
    Ok(res)
}

pub fn to_base64(bytes: &[u8]) -> String {
    let mut res = String::with_capacity((bytes.len() + 2) / 3 * 4);
    for chk in bytes.chunks(3) {
        let mut trip = [0u8; 3];
        trip[..chk.len()].copy_from_slice(chk);
        let acc = u32::from_be_bytes([0, trip[0], trip[1], trip[2]]);
        for i in 0..4 {
            if i <= chk.len() {
                res.push(B64[(acc >> (18 - 6 * i) & 63) as usize] as char);
            } else {
                res.push('=');
            }
        }
    }
    res
}

/// Lossy view of a byte buffer, non-ascii bytes are dropped.
pub fn to_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .filter(|c| c.is_ascii())
        .map(|&c| c as char)
        .collect()
}
