//! Color literals in command arguments (§4.5: "All color parsing accepts
//! `#rrggbbaa`, `rrggbb`, named palette entries, and integer palette
//! indices.").

/// A parsed color literal. Named and indexed colors are resolved against
/// the embedder's palette elsewhere; this module only recognizes the
/// *shape* of the literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Color {
    Rgba(u8, u8, u8, u8),
    Named(String),
    PaletteIndex(u32),
}

pub fn parse(input: &str) -> Option<Color> {
    let s = input.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    if s.len() == 6 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return parse_hex(s);
    }
    if let Ok(index) = s.parse::<u32>() {
        return Some(Color::PaletteIndex(index));
    }
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Some(Color::Named(s.to_string()));
    }
    None
}

fn parse_hex(hex: &str) -> Option<Color> {
    let bytes = match hex.len() {
        6 => {
            let rgb = u32::from_str_radix(hex, 16).ok()?;
            [(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8, 0xff]
        }
        8 => {
            let rgba = u32::from_str_radix(hex, 16).ok()?;
            [(rgba >> 24) as u8, (rgba >> 16) as u8, (rgba >> 8) as u8, rgba as u8]
        }
        _ => return None,
    };
    Some(Color::Rgba(bytes[0], bytes[1], bytes[2], bytes[3]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rrggbb() {
        assert_eq!(parse("ff0080"), Some(Color::Rgba(0xff, 0x00, 0x80, 0xff)));
    }

    #[test]
    fn parses_hash_rrggbbaa() {
        assert_eq!(parse("#112233cc"), Some(Color::Rgba(0x11, 0x22, 0x33, 0xcc)));
    }

    #[test]
    fn parses_palette_index() {
        assert_eq!(parse("42"), Some(Color::PaletteIndex(42)));
    }

    #[test]
    fn parses_named_color() {
        assert_eq!(parse("Maroon"), Some(Color::Named("Maroon".to_string())));
    }
}
