//! SQL literal quoting and bind rendering for CLI clients.
//!
//! Both command-line clients accept literal SQL only, so bind parameters are
//! rendered into the statement text before it is sent.

use obreplay_domain::{BindParams, SqlParam};

/// Escape string literal for safe SQL interpolation.
/// Doubles any embedded single quotes and wraps in single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn render_param(param: &SqlParam) -> String {
    match param {
        SqlParam::Text(text) => quote_literal(text),
        SqlParam::Integer(n) => n.to_string(),
        SqlParam::Timestamp(ts) => format!(
            "TO_DATE('{}', 'YYYY-MM-DD HH24:MI:SS')",
            ts.format("%Y-%m-%d %H:%M:%S")
        ),
    }
}

fn is_bind_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Replaces `:name` placeholders with literals.
///
/// Placeholders inside single-quoted literals or double-quoted identifiers are
/// left alone, as are names with no matching parameter.
pub fn render_binds(statement: &str, params: &BindParams) -> String {
    if params.is_empty() {
        return statement.to_string();
    }

    let mut out = String::with_capacity(statement.len());
    let mut chars = statement.char_indices().peekable();
    let mut quote: Option<char> = None;

    while let Some((pos, c)) = chars.next() {
        if let Some(open) = quote {
            out.push(c);
            if c == open {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
            }
            ':' => {
                let start = pos + 1;
                let mut end = start;
                while let Some(&(next_pos, next)) = chars.peek() {
                    if !is_bind_char(next) {
                        break;
                    }
                    end = next_pos + next.len_utf8();
                    chars.next();
                }
                let name = &statement[start..end];
                match params.get(name).filter(|_| !name.is_empty()) {
                    Some(param) => out.push_str(&render_param(param)),
                    None => {
                        out.push(':');
                        out.push_str(name);
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}
