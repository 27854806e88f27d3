//! Line-preserving `.properties` documents.
//!
//! The host config, the rotation marker and the world-start sidecar all use
//! the Java properties format. Reading follows its rules (`#`/`!` comments,
//! `=`/`:`/whitespace separators, backslash escapes, `\uXXXX`, line
//! continuations). Writing only touches the entries that were set, so every
//! other line of an operator-maintained file survives byte for byte.

/// A parsed properties file that remembers its original layout.
#[derive(Debug, Clone, Default)]
pub struct PropertiesDocument {
    lines: Vec<Line>,
}

#[derive(Debug, Clone)]
enum Line {
    /// Blank or comment line, kept verbatim.
    Verbatim(String),
    /// A key/value entry. `raw` holds the natural lines it was read from.
    Entry {
        raw: Vec<String>,
        key: String,
        value: String,
    },
}

impl PropertiesDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut natural = text.lines();

        while let Some(first) = natural.next() {
            let trimmed = first.trim_start_matches([' ', '\t', '\u{c}']);
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                lines.push(Line::Verbatim(first.to_string()));
                continue;
            }

            let mut raw = vec![first.to_string()];
            let mut logical = String::from(trimmed);
            while ends_with_continuation(&logical) {
                logical.pop();
                match natural.next() {
                    Some(next) => {
                        raw.push(next.to_string());
                        logical.push_str(next.trim_start_matches([' ', '\t', '\u{c}']));
                    }
                    None => break,
                }
            }

            let (key, value) = split_entry(&logical);
            lines.push(Line::Entry { raw, key, value });
        }

        Self { lines }
    }

    /// Value of `key`; the last occurrence wins, as with `java.util.Properties`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| match line {
            Line::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Set `key`, rewriting every existing occurrence in place or appending
    /// a new line at the end.
    pub fn set(&mut self, key: &str, value: &str) {
        let rendered = format!("{}={}", escape(key, true), escape(value, false));
        let mut found = false;
        for line in &mut self.lines {
            if let Line::Entry { raw, key: k, value: v } = line {
                if k == key {
                    *raw = vec![rendered.clone()];
                    *v = value.to_string();
                    found = true;
                }
            }
        }
        if !found {
            self.lines.push(Line::Entry {
                raw: vec![rendered],
                key: key.to_string(),
                value: value.to_string(),
            });
        }
    }

    /// Append a comment line (`# text`).
    pub fn push_comment(&mut self, text: &str) {
        if text.is_empty() {
            self.lines.push(Line::Verbatim("#".to_string()));
        } else {
            self.lines.push(Line::Verbatim(format!("# {}", text)));
        }
    }

    pub fn push_blank(&mut self) {
        self.lines.push(Line::Verbatim(String::new()));
    }

    /// Entries in file order, duplicates included.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { key, value, .. } => Some((key.as_str(), value.as_str())),
            Line::Verbatim(_) => None,
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Verbatim(text) => {
                    out.push_str(text);
                    out.push('\n');
                }
                Line::Entry { raw, .. } => {
                    for text in raw {
                        out.push_str(text);
                        out.push('\n');
                    }
                }
            }
        }
        out
    }
}

/// Decode file bytes: UTF-8 when valid, otherwise ISO-8859-1.
pub fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err.into_bytes().into_iter().map(char::from).collect(),
    }
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn split_entry(logical: &str) -> (String, String) {
    let chars: Vec<char> = logical.chars().collect();
    let mut i = 0;
    let mut key_end = chars.len();
    let mut value_start = chars.len();

    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '=' | ':' => {
                key_end = i;
                value_start = i + 1;
                break;
            }
            ' ' | '\t' | '\u{c}' => {
                key_end = i;
                let mut j = i;
                while j < chars.len() && matches!(chars[j], ' ' | '\t' | '\u{c}') {
                    j += 1;
                }
                if j < chars.len() && matches!(chars[j], '=' | ':') {
                    j += 1;
                }
                value_start = j;
                break;
            }
            _ => i += 1,
        }
    }

    let key_end = key_end.min(chars.len());
    let value_start = value_start.min(chars.len());
    let key: String = chars[..key_end].iter().collect();
    let value: String = chars[value_start..]
        .iter()
        .collect::<String>()
        .trim_start_matches([' ', '\t', '\u{c}'])
        .to_string();

    (unescape(&key), unescape(&value))
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // UTF-16 units from consecutive \uXXXX escapes, so surrogate pairs decode
    let mut units: Vec<u16> = Vec::new();
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            flush_units(&mut out, &mut units);
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            break;
        };
        if escaped == 'u' {
            let hex: String = chars.by_ref().take(4).collect();
            match u16::from_str_radix(&hex, 16) {
                Ok(unit) => units.push(unit),
                Err(_) => {
                    flush_units(&mut out, &mut units);
                    out.push_str("\\u");
                    out.push_str(&hex);
                }
            }
            continue;
        }
        flush_units(&mut out, &mut units);
        out.push(match escaped {
            't' => '\t',
            'n' => '\n',
            'r' => '\r',
            'f' => '\u{c}',
            other => other,
        });
    }
    flush_units(&mut out, &mut units);
    out
}

fn flush_units(out: &mut String, units: &mut Vec<u16>) {
    if !units.is_empty() {
        out.push_str(&String::from_utf16_lossy(units));
        units.clear();
    }
}

fn escape(text: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for (index, c) in text.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{c}' => out.push_str("\\f"),
            ' ' if is_key || index == 0 => out.push_str("\\ "),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            c if (' '..='~').contains(&c) => out.push(c),
            c => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    out.push_str(&format!("\\u{:04X}", unit));
                }
            }
        }
    }
    out
}
