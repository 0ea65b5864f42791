//! ISO 9075 escaping of node names that are not valid XML element names:
//! offending characters become `_xHHHH_`.

pub fn encode(name: &str) -> String {
    match name.split_once(':') {
        Some((prefix, local)) if is_prefix(prefix) => format!("{prefix}:{}", encode_local(local)),
        _ => encode_local(name),
    }
}

pub fn decode(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len());
    let mut i = 0;
    while i < chars.len() {
        if let Some((ch, len)) = escape_at(&chars, i) {
            out.push(ch);
            i += len;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn encode_local(local: &str) -> String {
    let chars: Vec<char> = local.chars().collect();
    let mut out = String::with_capacity(local.len());
    for (i, &ch) in chars.iter().enumerate() {
        let valid = if i == 0 {
            is_name_start(ch)
        } else {
            is_name_char(ch)
        };
        if ch == '_' && escape_at(&chars, i).is_some() {
            out.push_str("_x005f_");
        } else if valid {
            out.push(ch);
        } else {
            for unit in ch.encode_utf16(&mut [0u16; 2]) {
                out.push_str(&format!("_x{:04x}_", unit));
            }
        }
    }
    out
}

/// Decodes the escape starting at `i`, if `_xHHHH_` is there, along with the
/// number of chars it spans. A high surrogate only decodes together with the
/// low surrogate escape right after it.
fn escape_at(chars: &[char], i: usize) -> Option<(char, usize)> {
    let unit = escape_unit(chars, i)?;
    if let Some(ch) = char::from_u32(u32::from(unit)) {
        return Some((ch, 7));
    }
    let low = escape_unit(chars, i + 7)?;
    match char::decode_utf16([unit, low]).next()? {
        Ok(ch) => Some((ch, 14)),
        Err(_) => None,
    }
}

fn escape_unit(chars: &[char], i: usize) -> Option<u16> {
    if i + 7 > chars.len() || chars[i] != '_' || chars[i + 1] != 'x' || chars[i + 6] != '_' {
        return None;
    }
    if !chars[i + 2..i + 6].iter().all(char::is_ascii_hexdigit) {
        return None;
    }
    let hex: String = chars[i + 2..i + 6].iter().collect();
    u16::from_str_radix(&hex, 16).ok()
}

fn is_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    matches!(chars.next(), Some(c) if is_name_start(c)) && chars.all(is_name_char)
}

fn is_name_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(encode("content"), "content");
        assert_eq!(encode("jcr:content"), "jcr:content");
    }

    #[test]
    fn invalid_characters_are_escaped() {
        assert_eq!(encode("my page"), "my_x0020_page");
        assert_eq!(encode("1st"), "_x0031_st");
        assert_eq!(encode("a_x0020_b"), "a_x005f_x0020_b");
    }

    #[test]
    fn decode_reverses_encode() {
        for name in ["my page", "1st", "a_x0020_b", "jcr:content", "dé jà", "a😀b"] {
            assert_eq!(decode(&encode(name)), name);
        }
    }

    #[test]
    fn supplementary_characters_use_surrogate_pairs() {
        assert_eq!(encode("a😀b"), "a_xd83d__xde00_b");
        assert_eq!(decode("a_xd83d__xde00_b"), "a😀b");
        assert_eq!(decode("_xd83d_"), "_xd83d_");
        assert_eq!(decode("_xde00_"), "_xde00_");
        assert_eq!(decode(&encode("_xd83d__xde00_")), "_xd83d__xde00_");
    }

    #[test]
    fn malformed_escapes_are_left_alone() {
        assert_eq!(decode("_x00zz_"), "_x00zz_");
        assert_eq!(decode("_x12"), "_x12");
        assert_eq!(decode("_x+041_"), "_x+041_");
    }
}
