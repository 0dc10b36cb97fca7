//! Parser for the line-oriented query dump format.
//!
//! Malformed records are logged and skipped; optimization proceeds on
//! whatever was salvaged (best-effort).

use crate::error::{GraphError, ParseError};
use crate::graph::{Join, QueryGraph, Relation};
use std::collections::HashMap;
use tracing::warn;

struct RawJoin {
    left_name: String,
    right_name: String,
    selectivity: f64,
}

/// Parse a query dump into a [`QueryGraph`].
///
/// The parser tracks two flags: `seen_join` becomes true after the first
/// `join` line, and `read` becomes true once the first `input` line after
/// `seen_join` is encountered. Only records emitted while `read` is true
/// are retained — this lets a dump file contain multiple sections, keeping
/// only the last `input` block and its followers.
pub fn parse_dump(text: &str) -> Result<QueryGraph, GraphError> {
    let mut relations = Vec::new();
    let mut raw_joins = Vec::new();
    let mut cardinalities = HashMap::new();

    let mut seen_join = false;
    let mut read = false;

    for (line_no, line) in text.lines().enumerate() {
        let line_number = line_no + 1;
        let tokens: Vec<&str> = line.split(' ').filter(|t| !t.is_empty()).collect();
        let Some(&kind) = tokens.first() else {
            continue;
        };

        match kind {
            "input" => {
                if seen_join {
                    read = true;
                }
                if !read {
                    continue;
                }
                match parse_input_record(&tokens, line_number) {
                    Ok(relation) => relations.push(relation),
                    Err(e) => warn!(error = %e, line = line_number, "skipping malformed input record"),
                }
            }
            "join" => {
                seen_join = true;
                if !read {
                    continue;
                }
                match parse_join_record(&tokens, line_number) {
                    Ok(join) => raw_joins.push(join),
                    Err(e) => warn!(error = %e, line = line_number, "skipping malformed join record"),
                }
            }
            "o" => {
                if !read {
                    continue;
                }
                match parse_cardinality_record(&tokens, line_number) {
                    Ok((mask, card)) => {
                        cardinalities.insert(mask, card);
                    }
                    Err(e) => warn!(error = %e, line = line_number, "skipping malformed o record"),
                }
            }
            _ => {}
        }
    }

    let name_to_mask: HashMap<&str, u64> = relations
        .iter()
        .map(|r: &Relation| (r.name.as_str(), 1u64 << r.id))
        .collect();

    let mut joins = Vec::with_capacity(raw_joins.len());
    for raw in raw_joins {
        let left = name_to_mask.get(raw.left_name.as_str());
        let right = name_to_mask.get(raw.right_name.as_str());
        match (left, right) {
            (Some(&left), Some(&right)) => joins.push(Join {
                left,
                right,
                selectivity: raw.selectivity,
            }),
            _ => {
                let unknown = if left.is_none() {
                    raw.left_name
                } else {
                    raw.right_name
                };
                warn!(relation = %unknown, "join references unknown relation, skipping");
            }
        }
    }

    QueryGraph::build(relations, joins, cardinalities)
}

fn parse_input_record(tokens: &[&str], line: usize) -> Result<Relation, ParseError> {
    // input <id> <cardinality> <table_size> <name>
    let id_tok = tokens.get(1).ok_or(ParseError::MalformedJoin { line })?;
    let card_tok = tokens.get(2).ok_or(ParseError::MalformedJoin { line })?;
    let size_tok = tokens.get(3).ok_or(ParseError::MalformedJoin { line })?;
    let name_tok = tokens.get(4).ok_or(ParseError::MalformedJoin { line })?;

    let id: u32 = id_tok.parse().map_err(|_| ParseError::BadInt {
        line,
        token: id_tok.to_string(),
    })?;
    let cardinality: f64 = card_tok.parse().map_err(|_| ParseError::BadReal {
        line,
        token: card_tok.to_string(),
    })?;
    let table_size: f64 = size_tok.parse().map_err(|_| ParseError::BadReal {
        line,
        token: size_tok.to_string(),
    })?;

    Ok(Relation {
        name: name_tok.to_string(),
        id,
        table_size,
        cardinality,
    })
}

fn parse_join_record(tokens: &[&str], line: usize) -> Result<RawJoin, ParseError> {
    // join [rel_a="<name_a>" [rel_b="<name_b>"] sel=<selectivity>
    let rel_a = tokens.get(1).ok_or(ParseError::MalformedJoin { line })?;
    let rel_b = tokens.get(2).ok_or(ParseError::MalformedJoin { line })?;
    let sel = tokens.get(3).ok_or(ParseError::MalformedJoin { line })?;

    let left_name = strip_wrapper(rel_a, "[rel_a=\"", "\"").ok_or(ParseError::MalformedJoin { line })?;
    let right_name =
        strip_wrapper(rel_b, "[rel_b=\"", "\"]").ok_or(ParseError::MalformedJoin { line })?;
    let sel_str = sel
        .strip_prefix("sel=")
        .ok_or(ParseError::MalformedJoin { line })?;
    let selectivity: f64 = sel_str.parse().map_err(|_| ParseError::BadReal {
        line,
        token: sel_str.to_string(),
    })?;

    Ok(RawJoin {
        left_name,
        right_name,
        selectivity,
    })
}

fn strip_wrapper(token: &str, prefix: &str, suffix: &str) -> Option<String> {
    token
        .strip_prefix(prefix)
        .and_then(|s| s.strip_suffix(suffix))
        .map(|s| s.to_string())
}

fn parse_cardinality_record(tokens: &[&str], line: usize) -> Result<(u64, f64), ParseError> {
    // o <subset_bitmask> <cardinality>
    let mask_tok = tokens.get(1).ok_or(ParseError::MalformedJoin { line })?;
    let card_tok = tokens.get(2).ok_or(ParseError::MalformedJoin { line })?;

    let mask: u64 = mask_tok.parse().map_err(|_| ParseError::BadInt {
        line,
        token: mask_tok.to_string(),
    })?;
    let cardinality: f64 = card_tok.parse().map_err(|_| ParseError::BadReal {
        line,
        token: card_tok.to_string(),
    })?;

    Ok((mask, cardinality))
}
