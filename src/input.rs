// src/input.rs
//
// Converts text typed into the send line into bytes for the history.

/// How the send line is interpreted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputMode {
    /// Latin-1 text with `\n`, `\r` and `\t` escapes
    #[default]
    Text,
    /// Hex digits, e.g. "0D 0A" or "0x0d0a"
    Hex,
}

impl InputMode {
    pub fn label(&self) -> &'static str {
        match self {
            InputMode::Text => "text",
            InputMode::Hex => "hex",
        }
    }
}

/// Parse the send line. Empty input yields no bytes.
pub fn parse_outgoing(input: &str, mode: InputMode) -> Result<Vec<u8>, String> {
    match mode {
        InputMode::Text => Ok(unescape_text(input)),
        InputMode::Hex => parse_hex(input),
    }
}

/// Substitute the literal two-character escapes `\n`, `\r` and `\t`.
/// Characters above U+00FF become `?`.
fn unescape_text(input: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            let escaped = match chars.peek() {
                Some('n') => Some(b'\n'),
                Some('r') => Some(b'\r'),
                Some('t') => Some(b'\t'),
                _ => None,
            };
            if let Some(byte) = escaped {
                chars.next();
                bytes.push(byte);
                continue;
            }
        }
        bytes.push(u8::try_from(u32::from(c)).unwrap_or(b'?'));
    }

    bytes
}

/// Parse hex digits, ignoring whitespace and `0x` prefixes.
fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
    let digits: String = input
        .split_whitespace()
        .map(|word| {
            word.strip_prefix("0x")
                .or_else(|| word.strip_prefix("0X"))
                .unwrap_or(word)
        })
        .collect();

    if digits.len() % 2 != 0 {
        return Err("Hex string must have even length".to_string());
    }

    hex::decode(&digits).map_err(|e| format!("Invalid hex input: {}", e))
}
