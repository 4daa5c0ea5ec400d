//! The command-string grammar (§4.5, §6.4): `CMD-<arg>[,<arg>]*` or
//! `CMD<digits>` depending on family.

use crate::command::color::{self, Color};

/// Bare command names that carry no `^`/`@`/`?` prefix (§4.3 P9: "one of
/// the literal command names in the known-commands table").
const BARE_KNOWN_COMMANDS: &[&str] = &["PAGE", "ABEEP", "ADBEEP", "BEEP", "DBEEP"];

/// Whether `s` begins with a recognized command opcode (§4.3 P9).
pub fn starts_with_known_prefix(s: &str) -> bool {
    let t = s.trim_start();
    let Some(&first) = t.as_bytes().first() else {
        return false;
    };
    if matches!(first, b'^' | b'@' | b'?') {
        return true;
    }
    let upper = t.to_ascii_uppercase();
    if upper.starts_with("GET ") || upper.starts_with("SET ") {
        return true;
    }
    let token: String = upper.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    BARE_KNOWN_COMMANDS.contains(&token.as_str())
}

/// Feed one received command-string segment into the concatenation
/// buffer, returning the command to dispatch once a recognized prefix is
/// present (P9). `pending` is cleared whenever a command is produced.
pub fn feed(pending: &mut String, incoming: &str) -> Option<String> {
    if starts_with_known_prefix(incoming) {
        pending.clear();
        return Some(incoming.to_string());
    }
    pending.push_str(incoming);
    if starts_with_known_prefix(pending) {
        let out = std::mem::take(pending);
        Some(out)
    } else {
        None
    }
}

/// Parse a `ports` argument: a comma-separated list of numbers and
/// `a-b` ranges, e.g. `"1,3,5-7"` → `[1, 3, 5, 6, 7]`.
pub fn parse_ports(spec: &str) -> Vec<u16> {
    let mut out = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((lo, hi)) = part.split_once('-') {
            if let (Ok(lo), Ok(hi)) = (lo.trim().parse::<u16>(), hi.trim().parse::<u16>()) {
                out.extend(lo..=hi);
                continue;
            }
        }
        if let Ok(n) = part.parse::<u16>() {
            out.push(n);
        }
    }
    out
}

/// Split `NAME-rest` into `(NAME, rest)`, normalizing `NAME` to upper case.
/// A command with no `-` (e.g. `^STP`, bare `BEEP`) returns an empty rest.
pub fn split_opcode(s: &str) -> (String, &str) {
    let t = s.trim_start_matches(['^', '@', '?']);
    match t.split_once('-') {
        Some((name, rest)) => (name.to_ascii_uppercase(), rest),
        None => (t.to_ascii_uppercase(), ""),
    }
}

/// Split a comma-separated argument list, trimming whitespace.
pub fn split_args(rest: &str) -> Vec<&str> {
    rest.split(',').map(str::trim).collect()
}

/// One beep family member (§4.5 "system sound commands").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeepKind {
    /// `ABEEP`: play the active beep sound.
    Active,
    /// `ADBEEP`: play the active double-beep sound.
    ActiveDouble,
    /// `BEEP`: play the standard beep sound.
    Standard,
    /// `DBEEP`: play the standard double-beep sound.
    StandardDouble,
}

/// A per-button property mutation addressed by port/channel (§4.5
/// `^TXT`/`^BMP`/.../`^ENA` family).
#[derive(Debug, Clone, PartialEq)]
pub enum ButtonProp {
    Text(String),
    Bitmap(String),
    Icon(i32),
    Font(i32),
    FillColor(Color),
    BorderColor(Color),
    TextColor(Color),
    TextEffectName(String),
    TextEffectColor(Color),
    Show(bool),
    Enable(bool),
    BargraphLevel(i32),
    BargraphRange(i32, i32),
}

/// A fully parsed command string (§4.5).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `PAGE-<name>`: flip the active page.
    Page(String),
    /// `@PPN-<popup>[,<page>]`: show a popup.
    PopupShow(String, Option<String>),
    /// `@PPF-<popup>` / `@PPK-<popup>`: hide a popup.
    PopupHide(String),
    /// `@PPG-<popup>`: toggle a popup's visibility.
    PopupToggle(String),
    /// `@PPM-<group>`: hide every visible popup in a group on the active page.
    PopupHideGroup(String),
    /// `@PPX`: hide every visible popup on the active page.
    PopupHideAll,
    /// `@PPT-<popup>,<deciseconds>`: set a popup's show timeout.
    PopupSetTimeout(String, u32),
    /// An addressed button-property mutation, or (`query: true`) a request
    /// for the current value of that property (`?BCF`, `?TXT`, ...).
    Button { ports: Vec<u16>, channels: Vec<u16>, prop: ButtonProp, query: bool },
    Beep(BeepKind),
    /// A pass-through overlay request the model does not interpret itself
    /// (`@AKB`/`@AKP`/`@EKP` keyboard/keypad popups, `@PHN` phone overlay,
    /// `^STP` stop): forwarded to the embedder as raw text.
    Overlay { opcode: String, raw: String },
    /// Recognized but not otherwise modeled.
    Unknown(String),
}

/// Parse one command string, already de-concatenated by [`feed`].
pub fn parse(text: &str) -> Command {
    let t = text.trim();
    let upper_first: String = t.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    if upper_first.eq_ignore_ascii_case("PAGE") {
        let (_, rest) = split_opcode(t);
        return Command::Page(rest.to_string());
    }
    match upper_first.to_ascii_uppercase().as_str() {
        "ABEEP" => return Command::Beep(BeepKind::Active),
        "ADBEEP" => return Command::Beep(BeepKind::ActiveDouble),
        "BEEP" => return Command::Beep(BeepKind::Standard),
        "DBEEP" => return Command::Beep(BeepKind::StandardDouble),
        _ => {}
    }

    let Some(&first) = t.as_bytes().first() else {
        return Command::Unknown(t.to_string());
    };
    match first {
        b'@' => parse_at_command(t),
        b'^' | b'?' => parse_caret_command(t),
        _ => Command::Unknown(t.to_string()),
    }
}

fn parse_at_command(t: &str) -> Command {
    let (name, rest) = split_opcode(t);
    let args = split_args(rest);
    match name.as_str() {
        "PPN" => Command::PopupShow(args.first().unwrap_or(&"").to_string(), args.get(1).map(|s| s.to_string())),
        "PPF" | "PPK" => Command::PopupHide(args.first().unwrap_or(&"").to_string()),
        "PPG" => Command::PopupToggle(args.first().unwrap_or(&"").to_string()),
        "PPM" => Command::PopupHideGroup(args.first().unwrap_or(&"").to_string()),
        "PPX" => Command::PopupHideAll,
        "PPT" => {
            let popup = args.first().unwrap_or(&"").to_string();
            let deciseconds = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
            Command::PopupSetTimeout(popup, deciseconds)
        }
        "AKB" | "AKP" | "EKP" | "PHN" => Command::Overlay { opcode: name, raw: rest.to_string() },
        _ => Command::Unknown(t.to_string()),
    }
}

fn parse_caret_command(t: &str) -> Command {
    let (name, rest) = split_opcode(t);
    let mut args = split_args(rest).into_iter();
    let ports = parse_ports(args.next().unwrap_or(""));
    let channels = parse_ports(args.next().unwrap_or(""));
    let arg = |args: &mut std::vec::IntoIter<&str>| args.next().unwrap_or("").to_string();

    let prop = match name.as_str() {
        "TXT" => ButtonProp::Text(args.collect::<Vec<_>>().join(",")),
        "BMP" => ButtonProp::Bitmap(arg(&mut args)),
        "ICO" => ButtonProp::Icon(arg(&mut args).parse().unwrap_or(0)),
        "FON" => ButtonProp::Font(arg(&mut args).parse().unwrap_or(0)),
        "BCF" => ButtonProp::FillColor(color::parse(&arg(&mut args)).unwrap_or(Color::PaletteIndex(0))),
        "BCB" => ButtonProp::BorderColor(color::parse(&arg(&mut args)).unwrap_or(Color::PaletteIndex(0))),
        "BCT" => ButtonProp::TextColor(color::parse(&arg(&mut args)).unwrap_or(Color::PaletteIndex(0))),
        "TEF" => ButtonProp::TextEffectName(arg(&mut args)),
        "TEC" => ButtonProp::TextEffectColor(color::parse(&arg(&mut args)).unwrap_or(Color::PaletteIndex(0))),
        "SHO" => ButtonProp::Show(arg(&mut args) != "0"),
        "ENA" => ButtonProp::Enable(arg(&mut args) != "0"),
        "BVL" => ButtonProp::BargraphLevel(arg(&mut args).parse().unwrap_or(0)),
        "BVN" => {
            let low = arg(&mut args).parse().unwrap_or(0);
            let high = arg(&mut args).parse().unwrap_or(0);
            ButtonProp::BargraphRange(low, high)
        }
        "STP" => return Command::Overlay { opcode: name, raw: rest.to_string() },
        _ => return Command::Unknown(t.to_string()),
    };
    let query = t.starts_with('?');
    Command::Button { ports, channels, prop, query }
}
