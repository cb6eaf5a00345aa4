//! Coercion of free-form model output into structured values.
//!
//! The text generator is untrusted: it may wrap JSON in prose, omit fields or
//! answer with no JSON at all. Every function here returns a usable value; the
//! [`ParseResult`] tag tells the caller whether the model's answer was used or
//! a deterministic fallback was substituted.

use crate::ledger::ratio_percent;
use crate::model::Subtask;
use crate::model::task::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY, MIN_DIFFICULTY};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::warn;

static FIRST_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("static pattern"));

const FALLBACK_EXPLANATION: &str = "Progress assessed based on subtask completion.";
const FALLBACK_COMPLETENESS_MESSAGE: &str = "Could you provide more details about this task?";
const MESSAGE_PREVIEW_CHARS: usize = 200;
const TITLE_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum ParseResult<T> {
    /// Parsed from the model's answer.
    Ok(T),
    /// The answer was unusable; this is the heuristic default.
    Fallback(T),
}

impl<T> ParseResult<T> {
    pub fn value(&self) -> &T {
        match self {
            Self::Ok(value) | Self::Fallback(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Ok(value) | Self::Fallback(value) => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ParseResult<U> {
        match self {
            Self::Ok(value) => ParseResult::Ok(f(value)),
            Self::Fallback(value) => ParseResult::Fallback(f(value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressAssessment {
    pub progress: u8,
    pub updated_subtasks: Vec<Subtask>,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProofVerdict {
    pub valid: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletenessCheck {
    pub needs_more_info: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub is_goal: bool,
    pub difficulty: u8,
    pub due_date: Option<String>,
}

/// Returns the first balanced `{...}` or `[...]` block in `raw`, whichever
/// opens first. String literals are skipped so braces inside them do not
/// count.
pub fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find(['{', '['])?;
    balanced_from(raw, start)
}

/// Like [`extract_json`] but only considers blocks opened by `open`.
pub fn extract_json_of(raw: &str, open: char) -> Option<&str> {
    let mut offset = 0;
    while let Some(found) = raw[offset..].find(open) {
        let start = offset + found;
        if let Some(block) = balanced_from(raw, start) {
            return Some(block);
        }
        offset = start + open.len_utf8();
    }
    None
}

fn balanced_from(raw: &str, start: usize) -> Option<&str> {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(ch) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(&raw[start..start + index + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parses the first JSON block in `raw`, falling back to the first block
/// opened by `open` when the leading one is of the other kind or malformed.
fn parse_block(raw: &str, open: char) -> Option<Value> {
    let leading = extract_json(raw)
        .filter(|block| block.starts_with(open))
        .and_then(|block| serde_json::from_str(block).ok());
    leading.or_else(|| serde_json::from_str(extract_json_of(raw, open)?).ok())
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.trunc() as i64)),
        Value::String(text) => FIRST_INTEGER
            .find(text)
            .and_then(|found| found.as_str().parse().ok()),
        _ => None,
    }
}

fn value_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text.trim().eq_ignore_ascii_case("true"),
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn preview(raw: &str, limit: usize) -> String {
    raw.trim().chars().take(limit).collect()
}

/// First integer in the text, clamped into [1, 100]; 50 when there is none.
pub fn coerce_difficulty(raw: &str) -> ParseResult<u8> {
    match FIRST_INTEGER.find(raw) {
        Some(found) => {
            // Digit runs too long for u64 are still "a big number".
            let number = found.as_str().parse::<u64>().unwrap_or(u64::MAX);
            let clamped = number.clamp(u64::from(MIN_DIFFICULTY), u64::from(MAX_DIFFICULTY));
            ParseResult::Ok(clamped as u8)
        }
        None => {
            warn!(response = %preview(raw, 80), "difficulty rating had no number");
            ParseResult::Fallback(DEFAULT_DIFFICULTY)
        }
    }
}

/// Normalises a JSON array of subtask-like objects. Missing ids are
/// synthesised from `id_seed`, missing `completed` becomes false and entries
/// without text are dropped.
pub fn normalize_subtasks(items: &[Value], id_seed: i64) -> Vec<Subtask> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let text = non_empty_str(item.get("text"))?;
            let id = match item.get("id") {
                Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
                Some(Value::Number(id)) => id.to_string(),
                _ => synthesized_subtask_id(id_seed, index),
            };
            Some(Subtask {
                id,
                text,
                completed: value_truthy(item.get("completed")),
            })
        })
        .collect()
}

pub fn synthesized_subtask_id(id_seed: i64, index: usize) -> String {
    format!("subtask_{id_seed}_{index}")
}

pub fn default_subtasks(id_seed: i64) -> Vec<Subtask> {
    ["Start working on the task", "Complete the task"]
        .iter()
        .enumerate()
        .map(|(index, text)| Subtask {
            id: synthesized_subtask_id(id_seed, index + 1),
            text: (*text).to_string(),
            completed: false,
        })
        .collect()
}

pub fn coerce_subtasks(raw: &str, id_seed: i64) -> ParseResult<Vec<Subtask>> {
    let subtasks = match parse_block(raw, '[') {
        Some(Value::Array(items)) => normalize_subtasks(&items, id_seed),
        _ => Vec::new(),
    };

    if subtasks.is_empty() {
        warn!(response = %preview(raw, 80), "subtask generation unusable, using defaults");
        ParseResult::Fallback(default_subtasks(id_seed))
    } else {
        ParseResult::Ok(subtasks)
    }
}

/// The deterministic assessment used whenever the model cannot be trusted:
/// progress from the subtask completion ratio, subtasks untouched.
pub fn fallback_assessment(current: &[Subtask]) -> ProgressAssessment {
    ProgressAssessment {
        progress: ratio_percent(current).unwrap_or(0),
        updated_subtasks: current.to_vec(),
        explanation: FALLBACK_EXPLANATION.to_string(),
    }
}

pub fn coerce_progress(raw: &str, current: &[Subtask], id_seed: i64) -> ParseResult<ProgressAssessment> {
    let Some(Value::Object(object)) = parse_block(raw, '{') else {
        warn!(response = %preview(raw, 80), "progress assessment unusable, using subtask ratio");
        return ParseResult::Fallback(fallback_assessment(current));
    };

    let Some(progress) = object.get("progress").and_then(value_as_i64) else {
        warn!(response = %preview(raw, 80), "progress assessment has no progress value, using subtask ratio");
        return ParseResult::Fallback(fallback_assessment(current));
    };
    let progress = progress.clamp(0, 100) as u8;

    let updated_subtasks = match object.get("updatedSubtasks") {
        Some(Value::Array(items)) => normalize_subtasks(items, id_seed),
        _ => current.to_vec(),
    };

    let explanation = non_empty_str(object.get("explanation"))
        .unwrap_or_else(|| "Progress has been assessed and updated.".to_string());

    ParseResult::Ok(ProgressAssessment {
        progress,
        updated_subtasks,
        explanation,
    })
}

pub fn coerce_proof(raw: &str) -> ParseResult<ProofVerdict> {
    if let Some(Value::Object(object)) = parse_block(raw, '{') {
        let message = non_empty_str(object.get("message"))
            .or_else(|| non_empty_str(object.get("explanation")))
            .unwrap_or_else(|| "Proof validation completed".to_string());
        return ParseResult::Ok(ProofVerdict {
            valid: value_truthy(object.get("valid")),
            message,
        });
    }

    let lower = raw.to_lowercase();
    let valid = lower.contains("valid") && (lower.contains("true") || lower.contains("yes"));
    warn!(valid, "proof verdict unparseable, inferred from keywords");
    ParseResult::Fallback(ProofVerdict {
        valid,
        message: preview(raw, MESSAGE_PREVIEW_CHARS),
    })
}

pub fn coerce_completeness(raw: &str) -> ParseResult<CompletenessCheck> {
    if let Some(Value::Object(object)) = parse_block(raw, '{') {
        let needs_more_info = value_truthy(object.get("needsMoreInfo"));
        let message = if needs_more_info {
            Some(
                non_empty_str(object.get("message"))
                    .unwrap_or_else(|| FALLBACK_COMPLETENESS_MESSAGE.to_string()),
            )
        } else {
            None
        };
        return ParseResult::Ok(CompletenessCheck {
            needs_more_info,
            message,
        });
    }

    let lower = raw.to_lowercase();
    let needs_more_info = lower.contains("true") || lower.contains("needs");
    ParseResult::Fallback(CompletenessCheck {
        needs_more_info,
        message: needs_more_info.then(|| FALLBACK_COMPLETENESS_MESSAGE.to_string()),
    })
}

pub fn coerce_task_draft(raw: &str, transcript: &str) -> ParseResult<TaskDraft> {
    let spoken = transcript.trim();
    let default_title = preview(spoken, TITLE_MAX_CHARS);

    let Some(Value::Object(object)) = parse_block(raw, '{') else {
        warn!("voice task draft unparseable, using transcript");
        return ParseResult::Fallback(TaskDraft {
            title: default_title,
            description: spoken.to_string(),
            is_goal: false,
            difficulty: DEFAULT_DIFFICULTY,
            due_date: None,
        });
    };

    let difficulty = object
        .get("difficulty")
        .and_then(value_as_i64)
        .filter(|value| *value != 0)
        .map(|value| value.clamp(i64::from(MIN_DIFFICULTY), i64::from(MAX_DIFFICULTY)) as u8)
        .unwrap_or(DEFAULT_DIFFICULTY);

    ParseResult::Ok(TaskDraft {
        title: non_empty_str(object.get("title"))
            .map(|title| preview(&title, TITLE_MAX_CHARS))
            .unwrap_or(default_title),
        description: non_empty_str(object.get("description")).unwrap_or_else(|| spoken.to_string()),
        is_goal: value_truthy(object.get("isGoal")),
        difficulty,
        due_date: non_empty_str(object.get("dueDate")).filter(|date| date != "null"),
    })
}
