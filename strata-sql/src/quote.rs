//! Identifier and string literal quoting.

use smol_str::SmolStr;

/// Quote an identifier with backticks, doubling embedded backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a string literal with single quotes.
///
/// Single quotes are doubled. Backslashes and control characters use
/// backslash escapes, so the literal never spans lines. Those escapes
/// assume the default `sql_mode`; under `NO_BACKSLASH_ESCAPES` the server
/// reads them literally.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Strip backticks from a parsed identifier.
pub(crate) fn unquote_ident(raw: &str) -> SmolStr {
    match raw.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        Some(inner) => SmolStr::new(inner.replace("``", "`")),
        None => SmolStr::new(raw),
    }
}

/// Decode a single- or double-quoted string literal.
pub(crate) fn unquote_string(raw: &str) -> String {
    let mut chars = raw.chars();
    let Some(quote) = chars.next() else {
        return String::new();
    };
    let body: Vec<char> = chars.collect();
    let body = match body.split_last() {
        Some((last, rest)) if *last == quote => rest,
        _ => &body[..],
    };

    let mut out = String::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        let c = body[i];
        if c == quote && body.get(i + 1) == Some(&quote) {
            out.push(quote);
            i += 2;
            continue;
        }
        if c == '\\' {
            if let Some(&next) = body.get(i + 1) {
                match next {
                    '0' => out.push('\0'),
                    'b' => out.push('\u{8}'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'Z' => out.push('\u{1a}'),
                    '%' | '_' => {
                        out.push('\\');
                        out.push(next);
                    }
                    other => out.push(other),
                }
                i += 2;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}
