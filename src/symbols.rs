//! Named control characters usable as `<NAME>` in templates and delimiters.
//!
//! The table is fixed: the ASCII C0 controls, `SPACE` and `DEL`. Lookups go both
//! ways; [`pretty`] uses the reverse direction to make wire text readable.

/// Every known symbol, in declaration order.
pub const SYMBOLS: &[(&str, char)] = &[
    ("NUL", '\u{00}'),
    ("SOH", '\u{01}'),
    ("STX", '\u{02}'),
    ("ETX", '\u{03}'),
    ("EOT", '\u{04}'),
    ("ENQ", '\u{05}'),
    ("ACK", '\u{06}'),
    ("BEL", '\u{07}'),
    ("BS", '\u{08}'),
    ("TAB", '\u{09}'),
    ("LF", '\u{0A}'),
    ("VT", '\u{0B}'),
    ("FF", '\u{0C}'),
    ("CR", '\u{0D}'),
    ("SO", '\u{0E}'),
    ("SI", '\u{0F}'),
    ("DLE", '\u{10}'),
    ("DC1", '\u{11}'),
    ("DC2", '\u{12}'),
    ("DC3", '\u{13}'),
    ("DC4", '\u{14}'),
    ("NAK", '\u{15}'),
    ("SYN", '\u{16}'),
    ("ETB", '\u{17}'),
    ("CAN", '\u{18}'),
    ("EM", '\u{19}'),
    ("SUB", '\u{1A}'),
    ("ESC", '\u{1B}'),
    ("FS", '\u{1C}'),
    ("GS", '\u{1D}'),
    ("RS", '\u{1E}'),
    ("US", '\u{1F}'),
    ("SPACE", '\u{20}'),
    ("DEL", '\u{7F}'),
];

/// Character for a symbol name, if the name is known.
pub fn character(name: &str) -> Option<char> {
    SYMBOLS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, c)| c)
}

/// Symbol name for a character, if it has one.
pub fn name(c: char) -> Option<&'static str> {
    SYMBOLS
        .iter()
        .find(|&&(_, sc)| sc == c)
        .map(|&(n, _)| n)
}

/// All known names, in declaration order.
pub fn names() -> impl Iterator<Item = &'static str> {
    SYMBOLS.iter().map(|&(n, _)| n)
}

/// Resolve raw template text that may contain `\x` escapes and `<NAME>` references.
///
/// Used for repetition delimiters. An escaped character is taken literally (so `\<CR>`
/// stays the four characters `<CR>`); an unknown `<NAME>` is kept as written.
pub fn resolve_symbols(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(c) = rest.chars().next() {
        rest = &rest[c.len_utf8()..];
        match c {
            '\\' => {
                if let Some(escaped) = rest.chars().next() {
                    out.push(escaped);
                    rest = &rest[escaped.len_utf8()..];
                } else {
                    out.push('\\');
                }
            }
            '<' => {
                let resolved = rest
                    .find('>')
                    .and_then(|end| character(&rest[..end]).map(|ch| (end, ch)));
                match resolved {
                    Some((end, ch)) => {
                        out.push(ch);
                        rest = &rest[end + 1..];
                    }
                    None => out.push('<'),
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Render wire text with every named control character replaced by `<NAME>`.
///
/// `SPACE` is left as a plain space so ordinary text stays readable.
pub fn pretty(wire: &str) -> String {
    let mut out = String::with_capacity(wire.len());
    for c in wire.chars() {
        match name(c) {
            Some(n) if c != ' ' => {
                out.push('<');
                out.push_str(n);
                out.push('>');
            }
            _ => out.push(c),
        }
    }
    out
}
