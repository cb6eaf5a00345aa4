use clap::{Parser, Subcommand, ValueEnum};
use petquest_core::config::ConfigOverrides;
use petquest_core::task_api::ListFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task or daily goal
    ///
    /// Example: petquest add "Write essay" --details "two pages on rivers"
    /// Example: petquest add "Meditate" --goal --difficulty 20
    Add {
        description: Option<String>,
        #[arg(long)]
        details: Option<String>,
        /// 1-100; skips the AI rating
        #[arg(long)]
        difficulty: Option<u8>,
        #[arg(long)]
        goal: bool,
        /// RFC3339 instant or YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        no_subtasks: bool,
        /// Do not ask the AI whether the description is specific enough
        #[arg(long)]
        skip_check: bool,
    },
    /// Create a task from a spoken recording
    ///
    /// Example: petquest voice memo.m4a
    Voice {
        file: PathBuf,
    },
    /// List tasks
    ///
    /// Example: petquest list --filter goals
    List {
        #[arg(long, value_enum, default_value_t = ListArg::Open)]
        filter: ListArg,
    },
    /// Show details of a task
    ///
    /// Example: petquest show task-1766232000000
    Show {
        id: String,
    },
    /// Edit a task's description
    Edit {
        id: String,
        description: String,
    },
    /// Replace a task's details; an empty string clears them
    Details {
        id: String,
        details: String,
    },
    /// Set or clear a due date
    ///
    /// Example: petquest due task-1 2025-12-24
    /// Example: petquest due task-1 --clear
    Due {
        id: String,
        date: Option<String>,
        #[arg(long, conflicts_with = "date")]
        clear: bool,
    },
    /// Collapse a task in listings
    Minimize {
        id: String,
        #[arg(long)]
        restore: bool,
    },
    /// Delete a task
    Delete {
        id: String,
    },
    /// Work with a task's subtasks
    Subtask {
        #[command(subcommand)]
        command: SubtaskCommand,
    },
    /// Describe progress and let the AI estimate completion
    ///
    /// Example: petquest progress task-1 "outline done" --check s1
    Progress {
        id: String,
        note: String,
        #[arg(long = "check", value_name = "SUBTASK_ID")]
        check: Vec<String>,
        #[arg(long = "uncheck", value_name = "SUBTASK_ID")]
        uncheck: Vec<String>,
    },
    /// Mark a task as completed
    Done {
        id: String,
    },
    /// Start a task's timer
    Start {
        id: String,
    },
    /// Pause a task's timer
    ///
    /// Example: petquest pause task-1 --note "first draft written"
    Pause {
        id: String,
        /// Run a progress assessment right after pausing
        #[arg(long)]
        note: Option<String>,
    },
    /// Daily goals
    Goal {
        #[command(subcommand)]
        command: GoalCommand,
    },
    /// Your pet
    Pet {
        #[command(subcommand)]
        command: PetCommand,
    },
    /// The item shop
    Shop {
        #[command(subcommand)]
        command: ShopCommand,
    },
    /// Send desktop reminders for overdue tasks and streaks at risk
    Notify,
}

#[derive(Subcommand, Debug)]
pub enum SubtaskCommand {
    /// Replace open subtasks with an AI breakdown
    Generate { id: String },
    Add { id: String, text: String },
    /// Rename a subtask; empty text deletes it
    Edit {
        id: String,
        subtask_id: String,
        text: String,
    },
    Delete { id: String, subtask_id: String },
    Toggle { id: String, subtask_id: String },
}

#[derive(Subcommand, Debug)]
pub enum GoalCommand {
    /// Submit a photo, video or text file (or --text) as today's proof
    ///
    /// Example: petquest goal proof task-1 run.jpg
    Proof {
        id: String,
        file: Option<PathBuf>,
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
    },
    /// Complete today's goal without proof
    Skip { id: String },
    History { id: String },
}

#[derive(Subcommand, Debug)]
pub enum PetCommand {
    Show,
    Rename { name: String },
    /// Equip or unequip an owned wearable
    Equip { item: String },
}

#[derive(Subcommand, Debug)]
pub enum ShopCommand {
    List {
        #[arg(long)]
        category: Option<String>,
    },
    Buy { item: String },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListArg {
    Open,
    All,
    Goals,
    Completed,
}

impl From<ListArg> for ListFilter {
    fn from(value: ListArg) -> Self {
        match value {
            ListArg::Open => ListFilter::Open,
            ListArg::All => ListFilter::All,
            ListArg::Goals => ListFilter::Goals,
            ListArg::Completed => ListFilter::Completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    Model,
    VisionModel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match field.as_str() {
        "theme" => ConfigOverrideTarget::Theme,
        "model" => ConfigOverrideTarget::Model,
        "vision_model" => ConfigOverrideTarget::VisionModel,
        other => return Err(format!("unknown config field '{other}'")),
    };
    if value.is_empty() {
        return Err(format!("{field} override needs a value"));
    }
    Ok(ParsedConfigOverride { target, value })
}

/// Folds every `--config-override` into one set; later flags win.
pub fn collect_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry)?;
        match parsed.target {
            ConfigOverrideTarget::Theme => overrides.theme = Some(parsed.value),
            ConfigOverrideTarget::Model => overrides.model = Some(parsed.value),
            ConfigOverrideTarget::VisionModel => overrides.vision_model = Some(parsed.value),
        }
    }
    Ok(overrides)
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
