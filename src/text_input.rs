/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Convenience parser for the plain-text edge-list input form: one
//! edge per line, whitespace-separated `src dst [value]`.

use anyhow::{Context, Result};

/// One parsed input line: the two vertex ids and an optional trailing
/// value token, carried as borrowed slices of the original line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeLine<'a> {
    pub src: u64,
    pub dst: u64,
    pub value: Option<&'a str>,
}

/// Parses one edge-list line. Blank lines and lines starting with `#` are
/// comments and return `Ok(None)`; anything else must have at least two
/// whitespace-separated fields.
pub fn parse_line(line: &str) -> Result<Option<EdgeLine<'_>>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut fields = trimmed.split_whitespace();
    let src = fields
        .next()
        .context("missing source vertex id")?
        .parse()
        .with_context(|| format!("source vertex id is not an integer: {trimmed:?}"))?;
    let dst = fields
        .next()
        .context("missing destination vertex id")?
        .parse()
        .with_context(|| format!("destination vertex id is not an integer: {trimmed:?}"))?;
    let value = fields.next();

    Ok(Some(EdgeLine { src, dst, value }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_plain_edge() {
        let parsed = parse_line("1 2").unwrap().unwrap();
        assert_eq!(parsed.src, 1);
        assert_eq!(parsed.dst, 2);
        assert_eq!(parsed.value, None);
    }

    #[test]
    fn parses_an_edge_with_a_value_token() {
        let parsed = parse_line("1\t2\t0.5").unwrap().unwrap();
        assert_eq!(parsed.src, 1);
        assert_eq!(parsed.dst, 2);
        assert_eq!(parsed.value, Some("0.5"));
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("   ").unwrap().is_none());
        assert!(parse_line("# a comment").unwrap().is_none());
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_line("not-a-number 2").is_err());
        assert!(parse_line("1").is_err());
    }
}
