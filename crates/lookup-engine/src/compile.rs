use lookup_model::{lookup_name, LookupDraft};
use thiserror::Error;

use crate::aggregate::GroupTable;

/// Errors raised while synthesizing or parsing a lookup formula literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("group '{group}': text {text:?} contains characters that cannot be escaped into a formula literal")]
    MalformedValue { group: String, text: String },
    #[error("malformed lookup formula at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: String },
}

/// Compile one group's pairs into the bracketed list-of-pairs literal:
/// `[['k1', 'v1'], ['k2', 'v2']]`.
///
/// Each atom is single-quoted with `\` and `'` backslash-escaped, so the
/// literal stays syntactically valid for any printable key or value text and
/// [`parse_formula`] can reproduce the pairs exactly. An empty group
/// compiles to `[]`.
pub fn compile_formula(group: &GroupTable) -> Result<String, CompileError> {
    let mut parts = Vec::with_capacity(group.pairs.len());
    for (key, value) in &group.pairs {
        let key = quote_atom(&group.group, key)?;
        let value = quote_atom(&group.group, value)?;
        parts.push(format!("[{key}, {value}]"));
    }
    Ok(format!("[{}]", parts.join(", ")))
}

/// Compile every group into a named [`LookupDraft`].
pub fn compile_lookups(groups: &[GroupTable]) -> Result<Vec<LookupDraft>, CompileError> {
    groups
        .iter()
        .map(|group| {
            Ok(LookupDraft {
                group: group.group.clone(),
                name: lookup_name(&group.group),
                formula: compile_formula(group)?,
            })
        })
        .collect()
}

fn quote_atom(group: &str, text: &str) -> Result<String, CompileError> {
    // Control characters have no representation inside the literal; reject
    // them instead of silently mangling the value.
    if text.chars().any(|c| c.is_control()) {
        return Err(CompileError::MalformedValue {
            group: group.to_string(),
            text: text.to_string(),
        });
    }

    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for c in text.chars() {
        if c == '\\' || c == '\'' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    Ok(quoted)
}

/// Parse a compiled formula literal back into its (key, value) pairs.
///
/// Inverse of [`compile_formula`]; whitespace between tokens is accepted
/// loosely, escapes inside atoms are not.
pub fn parse_formula(formula: &str) -> Result<Vec<(String, String)>, CompileError> {
    let mut parser = Parser {
        input: formula.as_bytes(),
        pos: 0,
    };

    parser.skip_ws();
    parser.expect(b'[')?;
    let mut pairs = Vec::new();
    parser.skip_ws();
    if !parser.eat(b']') {
        loop {
            parser.skip_ws();
            parser.expect(b'[')?;
            parser.skip_ws();
            let key = parser.atom()?;
            parser.skip_ws();
            parser.expect(b',')?;
            parser.skip_ws();
            let value = parser.atom()?;
            parser.skip_ws();
            parser.expect(b']')?;
            pairs.push((key, value));
            parser.skip_ws();
            if parser.eat(b',') {
                continue;
            }
            parser.expect(b']')?;
            break;
        }
    }
    parser.skip_ws();
    if parser.pos != parser.input.len() {
        return Err(CompileError::Malformed {
            offset: parser.pos,
            reason: "trailing characters after list".to_string(),
        });
    }
    Ok(pairs)
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn skip_ws(&mut self) {
        while self.input.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.input.get(self.pos) == Some(&byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), CompileError> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(CompileError::Malformed {
                offset: self.pos,
                reason: format!("expected '{}'", byte as char),
            })
        }
    }

    fn atom(&mut self) -> Result<String, CompileError> {
        self.expect(b'\'')?;
        let mut out = Vec::new();
        loop {
            match self.input.get(self.pos) {
                Some(b'\\') => {
                    let escaped =
                        self.input
                            .get(self.pos + 1)
                            .ok_or_else(|| CompileError::Malformed {
                                offset: self.pos,
                                reason: "dangling escape".to_string(),
                            })?;
                    if *escaped != b'\\' && *escaped != b'\'' {
                        return Err(CompileError::Malformed {
                            offset: self.pos,
                            reason: format!("invalid escape '\\{}'", *escaped as char),
                        });
                    }
                    out.push(*escaped);
                    self.pos += 2;
                }
                Some(b'\'') => {
                    self.pos += 1;
                    return String::from_utf8(out).map_err(|_| CompileError::Malformed {
                        offset: self.pos,
                        reason: "atom is not valid UTF-8".to_string(),
                    });
                }
                Some(byte) => {
                    out.push(*byte);
                    self.pos += 1;
                }
                None => {
                    return Err(CompileError::Malformed {
                        offset: self.pos,
                        reason: "unterminated atom".to_string(),
                    })
                }
            }
        }
    }
}
