//! Best-effort tool labels recovered from an event's text.
//!
//! This is the lowest-priority way of naming a tool. It only runs when a
//! stream event carries no structural name, and it never replaces one. Rules
//! are checked in a fixed order and the first rule that fires decides the
//! label; finer tie-breaks between co-occurring keywords are not attempted.

use aho_corasick::AhoCorasick;
use serde_json::Value;
use std::sync::OnceLock;

pub const UNKNOWN_TOOL: &str = "Unknown Tool";

const KEYWORDS: [&str; 14] = [
    "aws",
    "documentation",
    "search",
    "read",
    "mcp",
    "call",
    "invoke",
    "execute",
    "search_documentation",
    "read_documentation",
    "recommend",
    "function_call",
    "api_call",
    "service_call",
];

const AWS: usize = 0;
const DOCUMENTATION: usize = 1;
const SEARCH: usize = 2;
const READ: usize = 3;
const MCP: usize = 4;
const CALL: usize = 5;
const INVOKE: usize = 6;
const EXECUTE: usize = 7;
const SEARCH_DOCUMENTATION: usize = 8;
const READ_DOCUMENTATION: usize = 9;
const RECOMMEND: usize = 10;
const FUNCTION_CALL: usize = 11;
const API_CALL: usize = 12;
const SERVICE_CALL: usize = 13;

fn matcher() -> Option<&'static AhoCorasick> {
    static MATCHER: OnceLock<Option<AhoCorasick>> = OnceLock::new();
    MATCHER
        .get_or_init(|| {
            AhoCorasick::builder()
                .ascii_case_insensitive(true)
                .build(KEYWORDS)
                .ok()
        })
        .as_ref()
}

fn keyword_hits(text: &str) -> [bool; KEYWORDS.len()] {
    let mut hits = [false; KEYWORDS.len()];
    if let Some(matcher) = matcher() {
        for found in matcher.find_overlapping_iter(text) {
            hits[found.pattern().as_usize()] = true;
        }
    }
    hits
}

/// Guesses a human-readable tool label from free text.
pub fn infer_tool_label(text: &str) -> Option<&'static str> {
    let hits = keyword_hits(text);

    if hits[AWS] && hits[DOCUMENTATION] {
        return Some(if hits[SEARCH] {
            "AWS Documentation Search"
        } else if hits[READ] {
            "AWS Documentation Reader"
        } else {
            "AWS Documentation Tool"
        });
    }

    if hits[MCP] && (hits[CALL] || hits[INVOKE] || hits[EXECUTE]) {
        return Some(if hits[SEARCH_DOCUMENTATION] {
            "Documentation Search"
        } else if hits[READ_DOCUMENTATION] {
            "Documentation Reader"
        } else if hits[RECOMMEND] {
            "Content Recommender"
        } else {
            "MCP Tool"
        });
    }

    if hits[FUNCTION_CALL] || hits[API_CALL] || hits[SERVICE_CALL] {
        return Some("External Service");
    }

    None
}

/// Same as [`infer_tool_label`], over the serialized form of a JSON value.
pub fn infer_tool_label_for_value(value: &Value) -> Option<&'static str> {
    infer_tool_label(&value.to_string())
}

/// True for names that carry no information about the tool.
pub fn is_placeholder_name(name: &str) -> bool {
    let trimmed = name.trim();
    trimmed.is_empty() || trimmed == UNKNOWN_TOOL
}
