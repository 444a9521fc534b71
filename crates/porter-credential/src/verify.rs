//! Password checks for the MD5-based schemes.

use md5::{Digest, Md5};

use crate::error::{CredentialError, Result};
use crate::scheme::CredentialScheme;

/// Alphabet of the crypt(3)-style base64 used by phpass and md5-crypt.
const ITOA64: &[u8; 64] = b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

pub(crate) fn check(scheme: CredentialScheme, hash: &str, salt: &str, password: &str) -> Result<bool> {
    let expected = hash.to_ascii_lowercase();
    let ok = match scheme {
        CredentialScheme::Md5 => md5_hex(password.as_bytes()) == expected,
        CredentialScheme::SaltedMd5 => md5_hex(format!("{salt}{password}").as_bytes()) == expected,
        CredentialScheme::Vb3 => {
            let inner = md5_hex(password.as_bytes());
            md5_hex(format!("{inner}{salt}").as_bytes()) == expected
        }
        CredentialScheme::MyBb1 | CredentialScheme::Ipb3 => {
            let salted = md5_hex(salt.as_bytes());
            let inner = md5_hex(password.as_bytes());
            md5_hex(format!("{salted}{inner}").as_bytes()) == expected
        }
        CredentialScheme::PhpBb3 if hash.starts_with("$H$") || hash.starts_with("$P$") => {
            phpass(password, hash).is_some_and(|computed| computed == hash)
        }
        CredentialScheme::CryptMd5 => md5_crypt(password, hash).is_some_and(|computed| computed == hash),
        other => return Err(CredentialError::Unverifiable(other.to_string())),
    };
    Ok(ok)
}

fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

fn md5_bytes(parts: &[&[u8]]) -> [u8; 16] {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(*part);
    }
    let mut out = [0u8; 16];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// phpass portable hash: `$P$` + cost char + 8 salt chars + 22 hash chars.
fn phpass(password: &str, setting: &str) -> Option<String> {
    let bytes = setting.as_bytes();
    if bytes.len() < 12 {
        return None;
    }
    let log2 = ITOA64.iter().position(|&c| c == bytes[3])?;
    if !(7..=30).contains(&log2) {
        return None;
    }
    let salt = &bytes[4..12];

    let mut digest = md5_bytes(&[salt, password.as_bytes()]);
    for _ in 0..(1u64 << log2) {
        digest = md5_bytes(&[&digest[..], password.as_bytes()]);
    }

    let mut out = String::from_utf8_lossy(&bytes[..12]).into_owned();
    out.push_str(&encode64(&digest));
    Some(out)
}

fn encode64(input: &[u8]) -> String {
    let count = input.len();
    let mut out = String::new();
    let mut i = 0;
    loop {
        let mut value = u32::from(input[i]);
        i += 1;
        out.push(ITOA64[(value & 0x3f) as usize] as char);
        if i < count {
            value |= u32::from(input[i]) << 8;
        }
        out.push(ITOA64[((value >> 6) & 0x3f) as usize] as char);
        if i >= count {
            break;
        }
        i += 1;
        if i < count {
            value |= u32::from(input[i]) << 16;
        }
        out.push(ITOA64[((value >> 12) & 0x3f) as usize] as char);
        if i >= count {
            break;
        }
        i += 1;
        out.push(ITOA64[((value >> 18) & 0x3f) as usize] as char);
        if i >= count {
            break;
        }
    }
    out
}

/// `$1$salt$hash` md5-crypt.
fn md5_crypt(password: &str, setting: &str) -> Option<String> {
    const MAGIC: &[u8] = b"$1$";
    let rest = setting.strip_prefix("$1$")?;
    let salt_end = rest.find('$').unwrap_or(rest.len()).min(8);
    let salt = &rest.as_bytes()[..salt_end];
    let pw = password.as_bytes();

    let alt = md5_bytes(&[pw, salt, pw]);
    let mut ctx: Vec<u8> = [pw, MAGIC, salt].concat();
    let mut remaining = pw.len();
    while remaining > 0 {
        let take = remaining.min(16);
        ctx.extend_from_slice(&alt[..take]);
        remaining -= take;
    }
    let mut i = pw.len();
    while i != 0 {
        if i & 1 == 1 {
            ctx.push(0);
        } else {
            ctx.push(pw[0]);
        }
        i >>= 1;
    }
    let mut fin = md5_bytes(&[ctx.as_slice()]);

    for round in 0..1000 {
        let mut hasher = Md5::new();
        if round & 1 == 1 {
            hasher.update(pw);
        } else {
            hasher.update(fin);
        }
        if round % 3 != 0 {
            hasher.update(salt);
        }
        if round % 7 != 0 {
            hasher.update(pw);
        }
        if round & 1 == 1 {
            hasher.update(fin);
        } else {
            hasher.update(pw);
        }
        fin.copy_from_slice(&hasher.finalize());
    }

    let mut out = format!("$1${}$", String::from_utf8_lossy(salt));
    let groups = [(0, 6, 12), (1, 7, 13), (2, 8, 14), (3, 9, 15), (4, 10, 5)];
    for (a, b, c) in groups {
        let v = (u32::from(fin[a]) << 16) | (u32::from(fin[b]) << 8) | u32::from(fin[c]);
        to64(&mut out, v, 4);
    }
    to64(&mut out, u32::from(fin[11]), 2);
    Some(out)
}

fn to64(out: &mut String, mut value: u32, n: usize) {
    for _ in 0..n {
        out.push(ITOA64[(value & 0x3f) as usize] as char);
        value >>= 6;
    }
}
