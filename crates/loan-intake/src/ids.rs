use chrono::{DateTime, Utc};

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Largest multiple of the alphabet size that fits in a byte; higher bytes are redrawn.
const UNBIASED_LIMIT: u8 = 252;

/// Lowercase alphanumeric string of `len` characters, uniformly distributed.
pub(crate) fn random_alphanumeric(len: usize) -> String {
    let mut output = String::with_capacity(len);
    let mut buffer = [0u8; 32];
    while output.len() < len {
        rand::fill(&mut buffer[..]);
        let missing = len - output.len();
        output.extend(buffer.iter().filter_map(|byte| symbol(*byte)).take(missing));
    }
    output
}

fn symbol(byte: u8) -> Option<char> {
    (byte < UNBIASED_LIMIT).then(|| ALPHABET[usize::from(byte) % ALPHABET.len()] as char)
}

/// `<prefix>_<unix millis>_<9 alphanumerics>`.
pub(crate) fn timestamped(prefix: &str, at: DateTime<Utc>) -> String {
    format!(
        "{prefix}_{}_{}",
        at.timestamp_millis(),
        random_alphanumeric(9)
    )
}
