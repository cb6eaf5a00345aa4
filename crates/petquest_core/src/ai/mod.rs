//! External text-generation collaborators and the prompts sent to them.
//!
//! Every [`Assistant`] call returns `Err` only when the provider is
//! unavailable; whatever text comes back is coerced into a [`ParseResult`].

pub mod gemini;
pub mod transcribe;

pub use gemini::GeminiClient;
pub use transcribe::{DeepgramTranscriber, Transcriber, transcript_or_error};

use crate::coerce::{
    self, CompletenessCheck, ParseResult, ProgressAssessment, ProofVerdict, TaskDraft,
};
use crate::error::AppError;
use crate::model::{Subtask, Task};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, warn};

const TEXT_PROOF_PREVIEW_CHARS: usize = 2000;

/// Raw bytes handed to a vision-capable model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInput {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl MediaInput {
    /// Reads a recording for transcription. Only audio types are accepted.
    pub fn audio_from_path(path: &Path) -> Result<Self, AppError> {
        let mime_type = mime_for_path(path)
            .filter(|mime| mime.starts_with("audio/"))
            .ok_or_else(|| {
                AppError::invalid_input(format!("unsupported audio file type: {}", path.display()))
            })?;
        let data = std::fs::read(path)
            .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }
}

/// Evidence submitted for a proof check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Proof {
    Media(MediaInput),
    Text(String),
}

impl Proof {
    /// Reads a proof file; images and video go to the vision model, anything
    /// with a textual type is inlined into the prompt.
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let mime_type = mime_for_path(path).ok_or_else(|| {
            AppError::invalid_input(format!("unsupported proof file type: {}", path.display()))
        })?;
        let data = std::fs::read(path)
            .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;

        if mime_type.starts_with("text/") || mime_type == "application/json" {
            let text = String::from_utf8(data).map_err(|_| {
                AppError::invalid_input(format!("{} is not valid UTF-8", path.display()))
            })?;
            return Ok(Self::Text(text));
        }
        Ok(Self::Media(MediaInput {
            mime_type: mime_type.to_string(),
            data,
        }))
    }
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        _ => return None,
    };
    Some(mime)
}

/// A text-generation provider.
pub trait TextGenerator {
    fn model_name(&self) -> &str;

    fn generate(&self, prompt: &str) -> Result<String, AppError>;

    fn generate_with_media(&self, prompt: &str, media: &MediaInput) -> Result<String, AppError>;
}

/// Used when no API key is configured or `PETQUEST_AI_OFFLINE` is set.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineGenerator;

impl TextGenerator for OfflineGenerator {
    fn model_name(&self) -> &str {
        "offline"
    }

    fn generate(&self, _prompt: &str) -> Result<String, AppError> {
        Err(AppError::unavailable("AI is offline"))
    }

    fn generate_with_media(&self, _prompt: &str, _media: &MediaInput) -> Result<String, AppError> {
        Err(AppError::unavailable("AI is offline"))
    }
}

/// Replays queued answers in order and records every prompt it receives.
/// Runs dry with `unavailable` once the queue is empty.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    responses: RefCell<VecDeque<Result<String, AppError>>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: RefCell::new(responses.into_iter().map(|text| Ok(text.into())).collect()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn push_failure(&self, message: &str) {
        self.responses
            .borrow_mut()
            .push_back(Err(AppError::unavailable(message)));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    fn answer(&self, prompt: &str) -> Result<String, AppError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::unavailable("no scripted response left")))
    }
}

impl TextGenerator for ScriptedGenerator {
    fn model_name(&self) -> &str {
        "scripted"
    }

    fn generate(&self, prompt: &str) -> Result<String, AppError> {
        self.answer(prompt)
    }

    fn generate_with_media(&self, prompt: &str, _media: &MediaInput) -> Result<String, AppError> {
        self.answer(prompt)
    }
}

/// The prompts and coercions for every AI-backed operation.
pub struct Assistant<'a> {
    generator: &'a dyn TextGenerator,
}

impl<'a> Assistant<'a> {
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self { generator }
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    fn ask(&self, operation: &str, prompt: &str) -> Result<String, AppError> {
        debug!(operation, model = self.generator.model_name(), "sending prompt");
        self.generator.generate(prompt).inspect_err(|err| {
            warn!(operation, error = %err, "text generation failed");
        })
    }

    pub fn rate_difficulty(&self, task_text: &str) -> Result<ParseResult<u8>, AppError> {
        let prompt = format!(
            "Rate the difficulty of this task on a scale of 1-100, where 1 is very easy and 100 is extremely difficult.\n\
             Task: {task_text}\n\
             Respond with only a number between 1 and 100."
        );
        let raw = self.ask("rate_difficulty", &prompt)?;
        Ok(coerce::coerce_difficulty(&raw))
    }

    pub fn check_completeness(&self, task_text: &str) -> Result<ParseResult<CompletenessCheck>, AppError> {
        let prompt = format!(
            "Check if this task description needs additional information. Set a very low bar - only flag tasks that are extremely vague or meaningless (like \"do stuff\", \"things\", etc.). Reasonable tasks like \"Math Homework\", \"Call dentist\", \"Finish project\" should pass without requiring more info.\n\n\
             Task: {task_text}\n\n\
             Respond with JSON only:\n\
             {{\n  \"needsMoreInfo\": true/false,\n  \"message\": \"optional suggestion for what additional info would help (only if needsMoreInfo is true)\"\n}}"
        );
        let raw = self.ask("check_completeness", &prompt)?;
        Ok(coerce::coerce_completeness(&raw))
    }

    /// Breaks a task into two to four broad subtasks. `id_seed` feeds the ids
    /// synthesised for entries that come back without one.
    pub fn generate_subtasks(
        &self,
        task_text: &str,
        id_seed: i64,
    ) -> Result<ParseResult<Vec<Subtask>>, AppError> {
        let prompt = format!(
            "Break down this task into general, high-level subtasks. Keep subtasks broad and general, not overly specific or detailed.\n\n\
             Task: {task_text}\n\n\
             Guidelines:\n\
             - Create 2-4 general, high-level subtasks\n\
             - Keep them broad and general, not detailed or specific\n\
             - Focus on major phases or steps, not micro-tasks\n\
             - Avoid breaking tasks into too many small pieces\n\n\
             Respond with JSON array of subtasks only:\n\
             [\n  {{ \"id\": \"unique_id_1\", \"text\": \"General subtask\", \"completed\": false }},\n  {{ \"id\": \"unique_id_2\", \"text\": \"General subtask\", \"completed\": false }}\n]"
        );
        let raw = self.ask("generate_subtasks", &prompt)?;
        Ok(coerce::coerce_subtasks(&raw, id_seed))
    }

    pub fn assess_progress(
        &self,
        task: &Task,
        description: &str,
        id_seed: i64,
    ) -> Result<ParseResult<ProgressAssessment>, AppError> {
        let subtask_list = if task.subtasks.is_empty() {
            "No subtasks yet.".to_string()
        } else {
            task.subtasks
                .iter()
                .enumerate()
                .map(|(index, subtask)| format!("{}. {}", index + 1, subtask.text))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let description = if description.trim().is_empty() {
            "No description provided"
        } else {
            description.trim()
        };

        let prompt = format!(
            "Assess the progress on this task based on the user's description and current subtasks. Do not worry about which subtasks are already marked as complete - assess based solely on the user's progress description.\n\n\
             Task: {task_text}\n\
             Current Subtasks (id: text):\n{ids}\n{subtask_list}\n\n\
             User's Progress Description: {description}\n\n\
             Based on the user's description, determine:\n\
             1. What percentage of the task is complete (0-100)?\n\
             2. Which subtasks should be marked as completed based on the user's description?\n\
             3. Are there any new subtasks that should be added or existing ones that should be modified?\n\n\
             Respond with JSON only:\n\
             {{\n  \"progress\": 75,\n  \"updatedSubtasks\": [\n    {{ \"id\": \"id1\", \"text\": \"Updated subtask text\", \"completed\": true }}\n  ],\n  \"explanation\": \"Brief explanation of the progress assessment\"\n}}",
            task_text = task.prompt_text(),
            ids = task
                .subtasks
                .iter()
                .map(|subtask| subtask.id.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        );
        let raw = self.ask("assess_progress", &prompt)?;
        Ok(coerce::coerce_progress(&raw, &task.subtasks, id_seed))
    }

    /// Asks whether the evidence shows the task done. Goals get the stricter
    /// visual prompt; tasks include their difficulty.
    pub fn validate_proof(&self, task: &Task, proof: &Proof) -> Result<ParseResult<ProofVerdict>, AppError> {
        let raw = match proof {
            Proof::Media(media) => {
                let prompt = if task.is_goal {
                    format!(
                        "You are validating proof of completion for a goal. The user claims they completed: \"{}\"\n\n\
                         Please analyze the provided proof (image or video) and determine if it clearly demonstrates completion of this goal.\n\n\
                         Consider:\n\
                         1. Does the proof visually show the goal being completed?\n\
                         2. Is the proof clear and unambiguous?\n\
                         3. Does it match what would be expected for this type of goal?\n\n\
                         Respond with ONLY a JSON object in this format:\n\
                         {{\n    \"valid\": true/false,\n    \"message\": \"brief explanation\"\n}}",
                        task.description
                    )
                } else {
                    format!(
                        "I completed a task and need you to verify if my proof of completion matches the task requirements.\n\
                         Task: {}\n\
                         Difficulty Rating: {}/100\n\n\
                         Please analyze the provided image and check if it successfully demonstrates completion of this task. If the image contains visual content (screenshots, photos, diagrams, text), it should be considered valid proof.\n\
                         Respond with JSON only:\n\
                         {{\n  \"valid\": true/false,\n  \"explanation\": \"brief explanation of why it is/isn't valid\"\n}}",
                        task.prompt_text(),
                        task.difficulty
                    )
                };
                debug!(mime = %media.mime_type, bytes = media.data.len(), "sending proof media");
                self.generator
                    .generate_with_media(&prompt, media)
                    .inspect_err(|err| warn!(operation = "validate_proof", error = %err, "text generation failed"))?
            }
            Proof::Text(content) => {
                let preview: String = content.chars().take(TEXT_PROOF_PREVIEW_CHARS).collect();
                let prompt = format!(
                    "I completed a task and need you to verify if my proof of completion matches the task requirements.\n\
                     Task: {}\n\
                     Difficulty Rating: {}/100\n\
                     Proof content: {preview}\n\n\
                     Please check if the provided proof successfully demonstrates completion of this task.\n\
                     Respond with JSON only:\n\
                     {{\n  \"valid\": true/false,\n  \"explanation\": \"brief explanation of why it is/isn't valid\"\n}}",
                    task.prompt_text(),
                    task.difficulty
                );
                self.ask("validate_proof", &prompt)?
            }
        };
        Ok(coerce::coerce_proof(&raw))
    }

    pub fn draft_task(&self, transcript: &str) -> Result<ParseResult<TaskDraft>, AppError> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(AppError::invalid_input("transcript is required"));
        }
        let prompt = format!(
            "You are processing a voice input to create a task. Extract and format the task information.\n\n\
             User's voice input: \"{transcript}\"\n\n\
             Analyze the input and determine:\n\
             1. A short, concise task title (max 10-15 words)\n\
             2. A detailed description for the task (2-3 sentences explaining what needs to be done)\n\
             3. Whether this is a goal (recurring task) or a regular task. Look for keywords like \"goal\", \"daily\", \"habit\", \"every day\", \"regularly\", etc.\n\
             4. A difficulty rating (1-100)\n\
             5. If a date is mentioned, extract it and format as YYYY-MM-DD. If no date is mentioned, set to null.\n\n\
             Respond with JSON only:\n\
             {{\n  \"title\": \"Short task title\",\n  \"description\": \"Detailed description of the task\",\n  \"isGoal\": true/false,\n  \"difficulty\": 50,\n  \"dueDate\": \"YYYY-MM-DD\" or null\n}}"
        );
        let raw = self.ask("draft_task", &prompt)?;
        Ok(coerce::coerce_task_draft(&raw, transcript))
    }
}
