//! Placeholder substitution in sketch source text.

use std::path::Path;

use tracing::{info, warn};

use crate::KeyloadError;
use crate::keys::{Credentials, c_array};

/// One credential slot in the sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    AppEui,
    DevEui,
    AppKey,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::AppEui, Field::DevEui, Field::AppKey];

    /// Declaration prefix of the `PROGMEM` array.
    fn declaration(self) -> &'static str {
        match self {
            Field::AppEui => "static const u1_t PROGMEM APPEUI[8]",
            Field::DevEui => "static const u1_t PROGMEM DEVEUI[8]",
            Field::AppKey => "static const u1_t PROGMEM APPKEY[16]",
        }
    }

    /// Marker of the human-readable comment holding the MSB value.
    fn comment(self) -> &'static str {
        match self {
            Field::AppEui => "// Your AppEUI from ChirpStack:",
            Field::DevEui => "// Your DevEUI from ChirpStack:",
            Field::AppKey => "// Your AppKey from ChirpStack:",
        }
    }

    /// EUIs are stored LSB first, the key MSB first.
    fn reversed(self) -> bool {
        !matches!(self, Field::AppKey)
    }

    fn bytes(self, creds: &Credentials) -> &[u8] {
        match self {
            Field::AppEui => &creds.app_eui,
            Field::DevEui => &creds.dev_eui,
            Field::AppKey => &creds.app_key,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::AppEui => write!(f, "APPEUI"),
            Field::DevEui => write!(f, "DEVEUI"),
            Field::AppKey => write!(f, "APPKEY"),
        }
    }
}

/// Result of [`inject`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub text: String,
    /// Fields whose array declaration was not found.
    pub missing_arrays: Vec<Field>,
    /// Fields whose comment marker was not found.
    pub missing_comments: Vec<Field>,
}

/// Substitutes `creds` into sketch source `text`.
///
/// Every matching array body and comment is replaced; anything not found
/// is left untouched and listed in the result.
pub fn inject(text: &str, creds: &Credentials) -> Injection {
    let mut out = text.to_string();
    let mut missing_arrays = Vec::new();
    let mut missing_comments = Vec::new();

    for field in Field::ALL {
        let bytes = field.bytes(creds);
        let body = format!(" {} ", c_array(bytes, field.reversed()));
        let (next, hits) = replace_array_bodies(&out, field.declaration(), &body);
        out = next;
        if hits == 0 {
            missing_arrays.push(field);
        }

        let (next, hits) = replace_comment_tokens(&out, field.comment(), &hex::encode_upper(bytes));
        out = next;
        if hits == 0 {
            missing_comments.push(field);
        }
    }

    Injection {
        text: out,
        missing_arrays,
        missing_comments,
    }
}

/// Rewrites the sketch at `path` in place.
pub fn inject_file(path: &Path, creds: &Credentials) -> Result<Injection, KeyloadError> {
    let text = std::fs::read_to_string(path).map_err(|e| KeyloadError::io(path, e))?;
    let injection = inject(&text, creds);

    for field in &injection.missing_arrays {
        warn!(%field, sketch = %path.display(), "array declaration not found");
    }
    for field in &injection.missing_comments {
        warn!(%field, sketch = %path.display(), "comment marker not found");
    }

    std::fs::write(path, &injection.text).map_err(|e| KeyloadError::io(path, e))?;
    info!(sketch = %path.display(), "keys injected");
    Ok(injection)
}

/// Replaces the text between `{` and `}` following each `decl = `.
fn replace_array_bodies(text: &str, decl: &str, body: &str) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut hits = 0;

    while let Some(pos) = rest.find(decl) {
        let after_decl = pos + decl.len();
        out.push_str(&rest[..after_decl]);
        let tail = &rest[after_decl..];

        match array_body_span(tail) {
            Some((open, close)) => {
                out.push_str(&tail[..=open]);
                out.push_str(body);
                out.push('}');
                rest = &tail[close + 1..];
                hits += 1;
            }
            None => rest = tail,
        }
    }
    out.push_str(rest);
    (out, hits)
}

/// Byte offsets of `{` and `}` in `tail`, which must read `\s*=\s*{[^}]*}`.
fn array_body_span(tail: &str) -> Option<(usize, usize)> {
    let eq = skip_whitespace(tail, 0);
    if !tail[eq..].starts_with('=') {
        return None;
    }
    let open = skip_whitespace(tail, eq + 1);
    if !tail[open..].starts_with('{') {
        return None;
    }
    let close = open + 1 + tail[open + 1..].find('}')?;
    Some((open, close))
}

/// Replaces the first non-blank token after each `marker`.
fn replace_comment_tokens(text: &str, marker: &str, value: &str) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut hits = 0;

    while let Some(pos) = rest.find(marker) {
        let after_marker = pos + marker.len();
        let tail = &rest[after_marker..];
        let start = skip_whitespace(tail, 0);
        let len = tail[start..]
            .find(char::is_whitespace)
            .unwrap_or(tail.len() - start);

        out.push_str(&rest[..after_marker]);
        if len == 0 {
            rest = tail;
            continue;
        }
        out.push_str(&tail[..start]);
        out.push_str(value);
        rest = &tail[start + len..];
        hits += 1;
    }
    out.push_str(rest);
    (out, hits)
}

fn skip_whitespace(s: &str, from: usize) -> usize {
    s[from..]
        .find(|c: char| !c.is_whitespace())
        .map_or(s.len(), |i| from + i)
}
