//! Lexical primitives, called on demand by the parser rather than pre-tokenized
//! into a stream. Every routine here assumes the caller has already decided this
//! is the right alternative to try; none of them skip whitespace on their own
//! except `skip_whitespace` itself.

use crate::error::CompileError;
use crate::reader::SourceReader;
use crate::strings::StringPool;

const WORD_SIZE: usize = 8;
const MAX_IDENT_LEN: usize = 255;

pub fn skip_whitespace(r: &mut SourceReader) -> Result<(), CompileError> {
    loop {
        match r.peek() {
            Some(b) if b.is_ascii_whitespace() => {
                r.next();
            }
            Some(b'/') => {
                r.next();
                if r.peek() == Some(b'*') {
                    r.next();
                    loop {
                        match r.next() {
                            None => return Err(CompileError::lexical(r.pos(), "unclosed comment")),
                            Some(b'*') if r.peek() == Some(b'/') => {
                                r.next();
                                break;
                            }
                            _ => {}
                        }
                    }
                } else {
                    r.pushback(b'/');
                    return Ok(());
                }
            }
            _ => return Ok(()),
        }
    }
}

pub fn read_identifier(r: &mut SourceReader) -> Option<String> {
    let mut name = String::new();
    match r.peek() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return None,
    }
    while let Some(b) = r.peek() {
        if (b.is_ascii_alphanumeric() || b == b'_') && name.len() < MAX_IDENT_LEN {
            name.push(b as char);
            r.next();
        } else {
            break;
        }
    }
    Some(name)
}

/// Reads a run of digits; a leading `0` selects octal, otherwise decimal.
/// Returns `None` (rather than `Some(0)`) when no digit is present at all.
pub fn read_number(r: &mut SourceReader) -> Result<Option<i64>, CompileError> {
    match r.peek() {
        Some(b) if b.is_ascii_digit() => {}
        _ => return Ok(None),
    }
    let first = r.next().unwrap();
    if first == b'0' {
        let mut value: i64 = 0;
        while let Some(b) = r.peek() {
            if (b'0'..=b'7').contains(&b) {
                value = value * 8 + (b - b'0') as i64;
                r.next();
            } else {
                break;
            }
        }
        Ok(Some(value))
    } else {
        let mut value: i64 = (first - b'0') as i64;
        while let Some(b) = r.peek() {
            if b.is_ascii_digit() {
                value = value * 10 + (b - b'0') as i64;
                r.next();
            } else {
                break;
            }
        }
        Ok(Some(value))
    }
}

/// Resolves a `*`-escape (the byte immediately after `*`) to its literal byte value.
pub fn resolve_escape(r: &mut SourceReader, c: u8) -> Result<u8, CompileError> {
    Ok(match c {
        b'0' | b'e' => 0,
        b't' => b'\t',
        b'n' => b'\n',
        b'r' => b'\r',
        b'(' => b'(',
        b')' => b')',
        b'*' => b'*',
        b'\'' => b'\'',
        b'"' => b'"',
        other => {
            return Err(CompileError::lexical(
                r.pos(),
                format!("unknown escape '*{}'", other as char),
            ));
        }
    })
}

/// Reads a `'...'` literal (opening quote already consumed), packing up to
/// `WORD_SIZE` bytes little-endian into a single word.
pub fn read_character(r: &mut SourceReader) -> Result<i64, CompileError> {
    let mut value: i64 = 0;
    for i in 0..WORD_SIZE {
        let c = r
            .next()
            .ok_or_else(|| CompileError::lexical(r.pos(), "unclosed character literal"))?;
        if c == b'\'' {
            return Ok(value);
        }
        let byte = if c == b'*' {
            let e = r
                .next()
                .ok_or_else(|| CompileError::lexical(r.pos(), "unclosed character literal"))?;
            resolve_escape(r, e)?
        } else {
            c
        };
        value |= (byte as i64) << (i * 8);
    }
    match r.next() {
        Some(b'\'') => Ok(value),
        Some(_) => Err(CompileError::lexical(
            r.pos(),
            "character literal exceeds word size",
        )),
        None => Err(CompileError::lexical(r.pos(), "unclosed character literal")),
    }
}

/// Reads a `"..."` literal (opening quote already consumed) and pushes it
/// (NUL-terminated) into the string pool, returning its index.
pub fn read_string(r: &mut SourceReader, strings: &mut StringPool) -> Result<usize, CompileError> {
    let mut bytes = Vec::new();
    loop {
        match r.next() {
            None => return Err(CompileError::lexical(r.pos(), "unterminated string literal")),
            Some(b'"') => break,
            Some(b'*') => {
                let e = r
                    .next()
                    .ok_or_else(|| CompileError::lexical(r.pos(), "unterminated string literal"))?;
                bytes.push(resolve_escape(r, e)?);
            }
            Some(b) => bytes.push(b),
        }
    }
    Ok(strings.push(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(src: &str) -> SourceReader {
        SourceReader::new("<test>", src.as_bytes().to_vec())
    }

    #[test]
    fn reads_decimal_and_octal() {
        let mut r = reader("123 0777 0");
        assert_eq!(read_number(&mut r).unwrap(), Some(123));
        skip_whitespace(&mut r).unwrap();
        assert_eq!(read_number(&mut r).unwrap(), Some(0o777));
        skip_whitespace(&mut r).unwrap();
        assert_eq!(read_number(&mut r).unwrap(), Some(0));
    }

    #[test]
    fn no_digit_is_none_not_zero() {
        let mut r = reader("abc");
        assert_eq!(read_number(&mut r).unwrap(), None);
    }

    #[test]
    fn reads_identifier_with_underscore() {
        let mut r = reader("_foo_bar2 ");
        assert_eq!(read_identifier(&mut r).as_deref(), Some("_foo_bar2"));
    }

    #[test]
    fn skips_block_comment_and_tracks_lines() {
        let mut r = reader("/* line1\nline2 */x");
        skip_whitespace(&mut r).unwrap();
        assert_eq!(r.next(), Some(b'x'));
        assert_eq!(r.pos().line, 2);
    }

    #[test]
    fn unclosed_comment_is_fatal() {
        let mut r = reader("/* never closes");
        assert!(skip_whitespace(&mut r).is_err());
    }

    #[test]
    fn escape_table_matches_spec() {
        let mut r = reader("");
        assert_eq!(resolve_escape(&mut r, b'0').unwrap(), 0);
        assert_eq!(resolve_escape(&mut r, b'e').unwrap(), 0);
        assert_eq!(resolve_escape(&mut r, b't').unwrap(), b'\t');
        assert_eq!(resolve_escape(&mut r, b'n').unwrap(), b'\n');
        assert_eq!(resolve_escape(&mut r, b'r').unwrap(), b'\r');
        assert_eq!(resolve_escape(&mut r, b'*').unwrap(), b'*');
        assert!(resolve_escape(&mut r, b'q').is_err());
    }

    #[test]
    fn character_literal_packs_little_endian() {
        let mut r = reader("ab'");
        let value = read_character(&mut r).unwrap();
        assert_eq!(value, (b'a' as i64) | ((b'b' as i64) << 8));
    }

    #[test]
    fn string_literal_pushes_to_pool() {
        let mut r = reader("hi*n\"");
        let mut pool = StringPool::new();
        let idx = read_string(&mut r, &mut pool).unwrap();
        assert_eq!(idx, 0);
    }
}
