use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use petquest_cli::cli::{
    Cli, Command, GoalCommand, PetCommand, ShopCommand, SubtaskCommand, collect_overrides,
};
use petquest_core::ai::{
    Assistant, DeepgramTranscriber, GeminiClient, MediaInput, OfflineGenerator, Proof, TextGenerator,
};
use petquest_core::clock::Clock;
use petquest_core::config::{self, Config, Palette};
use petquest_core::error::AppError;
use petquest_core::ledger::TextEdit;
use petquest_core::model::{Subtask, Task, TaskState};
use petquest_core::progress::{AssessmentOutcome, CompletionReward};
use petquest_core::shop::ShopItem;
use petquest_core::streak::{self, GoalCompletion};
use petquest_core::task_api::{self, AddOutcome, AiApplied, NewTask};
use petquest_core::timer::{PauseCheckpoint, format_duration};
use petquest_core::{economy, pet_api};
use serde::Serialize;
use std::io::{self, BufRead};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const OFFLINE_ENV_VAR: &str = "PETQUEST_AI_OFFLINE";
const LOG_ENV_VAR: &str = "PETQUEST_LOG";

struct Runtime {
    config: Config,
    palette: Palette,
    generator: Box<dyn TextGenerator>,
}

impl Runtime {
    fn from_overrides(raw_overrides: &[String]) -> Result<Self, AppError> {
        let overrides = collect_overrides(raw_overrides).map_err(AppError::invalid_input)?;
        let loaded = config::load_config_with_fallback();
        if let Some(err) = loaded.error {
            warn!(error = %err, "config unreadable, using defaults");
        }
        let config = config::merge_overrides(&loaded.config, &overrides);
        let palette = config::palette_for_theme(config.theme.as_deref());
        let generator = select_generator(&config);
        Ok(Self {
            config,
            palette,
            generator,
        })
    }

    fn assistant(&self) -> Assistant<'_> {
        Assistant::new(self.generator.as_ref())
    }
}

fn select_generator(config: &Config) -> Box<dyn TextGenerator> {
    if std::env::var_os(OFFLINE_ENV_VAR).is_some() {
        debug!("AI forced offline");
        return Box::new(OfflineGenerator);
    }
    match GeminiClient::from_env(config) {
        Some(Ok(client)) => Box::new(client),
        Some(Err(err)) => {
            warn!(error = %err, "AI client could not be built, continuing offline");
            Box::new(OfflineGenerator)
        }
        None => {
            debug!("GEMINI_API_KEY not set, AI offline");
            Box::new(OfflineGenerator)
        }
    }
}

/// Remembers the paused task so the assessment can run after the pause has
/// been saved.
#[derive(Default)]
struct CliCheckpoint {
    paused: Option<Task>,
}

impl PauseCheckpoint for CliCheckpoint {
    fn offer_progress_assessment(&mut self, task: &Task) {
        self.paused = Some(task.clone());
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let rendered =
        serde_json::to_string(value).map_err(|err| AppError::invalid_data(err.to_string()))?;
    println!("{rendered}");
    Ok(())
}

fn state_label(state: TaskState) -> &'static str {
    match state {
        TaskState::NotStarted => "not started",
        TaskState::InProgress => "in progress",
        TaskState::Completed => "completed",
    }
}

fn format_local(epoch_ms: i64, offset: UtcOffset) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(epoch_ms) * 1_000_000)
        .ok()
        .and_then(|instant| {
            instant
                .to_offset(offset)
                .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
                .ok()
        })
        .unwrap_or_else(|| "-".to_string())
}

fn due_label(task: &Task, clock: Clock) -> String {
    let Some(raw) = task.due_date.as_deref() else {
        return "-".to_string();
    };
    let overdue = !task.completed && task.due_at(clock.offset).is_some_and(|due| due <= clock.now);
    if overdue {
        format!("{raw} (overdue)")
    } else {
        raw.to_string()
    }
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Task")]
    description: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Difficulty")]
    difficulty: u8,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Time")]
    time: String,
}

impl TaskRow {
    fn new(task: &Task, clock: Clock) -> Self {
        let state = if task.is_goal {
            format!("goal, {} day streak", task.streak)
        } else {
            state_label(task.state()).to_string()
        };
        let description = if task.minimized {
            format!("{} [min]", task.description)
        } else {
            task.description.clone()
        };
        let mut time = format_duration(task.timer.elapsed_at(clock.now));
        if task.timer.is_running {
            time.push_str(" (running)");
        }
        Self {
            id: task.id.clone(),
            description,
            state,
            progress: format!("{}%", task.progress),
            difficulty: task.difficulty,
            due: due_label(task, clock),
            time,
        }
    }
}

#[derive(Tabled)]
struct ShopRow {
    #[tabled(rename = "ID")]
    id: &'static str,
    #[tabled(rename = "Item")]
    name: &'static str,
    #[tabled(rename = "Category")]
    category: &'static str,
    #[tabled(rename = "Price")]
    price: u64,
    #[tabled(rename = "Effect")]
    description: &'static str,
}

impl From<&ShopItem> for ShopRow {
    fn from(item: &ShopItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            category: item.category.label(),
            price: item.price,
            description: item.description,
        }
    }
}

fn print_task_table(tasks: &[Task], clock: Clock) {
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }
    let rows: Vec<TaskRow> = tasks.iter().map(|task| TaskRow::new(task, clock)).collect();
    let table = Table::new(rows).with(Style::sharp()).to_string();
    println!("{table}");
}

fn print_subtasks(subtasks: &[Subtask]) {
    for subtask in subtasks {
        let mark = if subtask.completed { "x" } else { " " };
        println!("  [{mark}] {} {}", subtask.id, subtask.text);
    }
}

fn print_task_detail(task: &Task, palette: &Palette, clock: Clock) {
    println!("{} {}", palette.accentize(&task.id), task.description);
    if !task.details.is_empty() {
        println!("  details: {}", task.details);
    }
    println!("  created: {}", format_local(task.created_at, clock.offset));
    if task.is_goal {
        let done_today = streak::completed_today(&task.history, clock.now, clock.offset);
        println!("  goal: {} day streak", task.streak);
        let last = task
            .last_completed
            .map(|ms| format_local(ms, clock.offset))
            .unwrap_or_else(|| "never".to_string());
        println!("  last completed: {last}");
        println!("  done today: {}", if done_today { "yes" } else { "no" });
    } else {
        println!(
            "  state: {}, {}% ({})",
            state_label(task.state()),
            task.progress,
            palette.mutedize(&format!("{:?}", task.progress_source).to_lowercase())
        );
        println!("  due: {}", due_label(task, clock));
    }
    println!(
        "  difficulty: {} (reward {} coins)",
        task.difficulty,
        task.coin_reward()
    );
    let running = if task.timer.is_running { "running" } else { "paused" };
    println!(
        "  timer: {} ({running})",
        format_duration(task.timer.elapsed_at(clock.now))
    );
    if !task.subtasks.is_empty() {
        println!("  subtasks:");
        print_subtasks(&task.subtasks);
    }
}

fn print_completion(reward: &CompletionReward) {
    println!(
        "Task complete! +{} coins, {} focused.",
        reward.coins_earned,
        format_duration(reward.time_committed_ms)
    );
}

fn print_goal_completion(completion: &GoalCompletion) {
    println!(
        "Streak: {} day(s). +{} coins.",
        completion.streak, completion.coins_earned
    );
}

fn print_add_outcome(outcome: &AddOutcome, palette: &Palette) {
    match outcome {
        AddOutcome::Created { task, notices } => {
            let kind = if task.is_goal { "goal" } else { "task" };
            println!(
                "Added {kind}: {} ({}) difficulty {}",
                task.description,
                palette.accentize(&task.id),
                task.difficulty
            );
            print_subtasks(&task.subtasks);
            for notice in notices {
                println!("{}", palette.mutedize(&format!("note: {notice}")));
            }
        }
        AddOutcome::NeedsMoreInfo { message } => {
            println!("Need more detail: {message}");
            println!("Re-run with --details \"...\" or --skip-check.");
        }
    }
}

fn print_assessment(outcome: &AssessmentOutcome, palette: &Palette) {
    println!("Progress: {}%", outcome.progress);
    if !outcome.explanation.is_empty() {
        println!("{}", outcome.explanation);
    }
    if let Some(notice) = &outcome.notice {
        println!("{}", palette.mutedize(&format!("note: {notice}")));
    }
    if let Some(reward) = &outcome.completion {
        print_completion(reward);
    }
}

/// Prints an AI-backed result, or why it was discarded.
fn print_applied<T>(applied: &AiApplied<T>, print: impl FnOnce(&T)) {
    match applied {
        AiApplied::Applied(value) => print(value),
        AiApplied::Dropped { reason } => println!("AI result discarded: {reason}"),
    }
}

fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::invalid_input(message)),
    }
}

fn run_command(cli: Cli) -> Result<(), AppError> {
    let runtime = Runtime::from_overrides(&cli.config_override)?;
    let palette = &runtime.palette;
    let json = cli.json;

    match cli.command {
        Command::Add {
            description,
            details,
            difficulty,
            goal,
            due,
            no_subtasks,
            skip_check,
        } => {
            let description = required(description, "description is required")?;
            let request = NewTask {
                description,
                details: details.unwrap_or_default(),
                difficulty,
                is_goal: goal,
                due_date: due,
                check_completeness: !skip_check,
                with_subtasks: !no_subtasks,
            };
            let outcome = task_api::add_task(request, &runtime.assistant())?;
            if json {
                print_json(&outcome)?;
            } else {
                print_add_outcome(&outcome, palette);
            }
        }
        Command::Voice { file } => {
            let audio = MediaInput::audio_from_path(&file)?;
            let transcriber = DeepgramTranscriber::from_env(runtime.config.request_timeout_secs)?;
            let outcome = task_api::add_task_from_voice(&audio, &transcriber, &runtime.assistant())?;
            if json {
                print_json(&outcome)?;
            } else {
                println!("Heard: \"{}\"", outcome.transcript);
                print_add_outcome(&outcome.outcome, palette);
            }
        }
        Command::List { filter } => {
            let tasks = task_api::list_tasks(filter.into())?;
            if json {
                print_json(&tasks)?;
            } else {
                print_task_table(&tasks, Clock::system());
            }
        }
        Command::Show { id } => {
            let task = task_api::get_task_by_id(&id)?;
            if json {
                print_json(&task)?;
            } else {
                print_task_detail(&task, palette, Clock::system());
            }
        }
        Command::Edit { id, description } => {
            let task = task_api::edit_task(&id, &description)?;
            if json {
                print_json(&task)?;
            } else {
                println!("Updated task: {} ({})", task.description, task.id);
            }
        }
        Command::Details { id, details } => {
            let task = task_api::set_details(&id, &details)?;
            if json {
                print_json(&task)?;
            } else if task.details.is_empty() {
                println!("Cleared details: {} ({})", task.description, task.id);
            } else {
                println!("Updated details: {} ({})", task.description, task.id);
            }
        }
        Command::Due { id, date, clear } => {
            let date = if clear {
                None
            } else {
                Some(required(date, "date is required unless --clear is given")?)
            };
            let task = task_api::set_due_date(&id, date.as_deref())?;
            if json {
                print_json(&task)?;
            } else {
                let due = task.due_date.as_deref().unwrap_or("-");
                println!("Due date for {} ({}): {due}", task.description, task.id);
            }
        }
        Command::Minimize { id, restore } => {
            let task = task_api::set_minimized(&id, !restore)?;
            if json {
                print_json(&task)?;
            } else if task.minimized {
                println!("Minimized task: {} ({})", task.description, task.id);
            } else {
                println!("Restored task: {} ({})", task.description, task.id);
            }
        }
        Command::Delete { id } => {
            let task = task_api::delete_task(&id)?;
            if json {
                print_json(&task)?;
            } else {
                println!("Deleted task: {} ({})", task.description, task.id);
            }
        }
        Command::Subtask { command } => run_subtask(command, &runtime, json)?,
        Command::Progress {
            id,
            note,
            check,
            uncheck,
        } => {
            let checked: Vec<(String, bool)> = check
                .into_iter()
                .map(|id| (id, true))
                .chain(uncheck.into_iter().map(|id| (id, false)))
                .collect();
            let outcome = task_api::assess_progress(&id, &note, &checked, &runtime.assistant())?;
            if json {
                print_json(&outcome)?;
            } else {
                print_applied(&outcome, |outcome| print_assessment(outcome, palette));
            }
        }
        Command::Done { id } => {
            let reward = task_api::mark_done(&id)?;
            if json {
                print_json(&reward)?;
            } else {
                print_completion(&reward);
            }
        }
        Command::Start { id } => {
            let change = task_api::start_timer(&id)?;
            if json {
                print_json(&change)?;
            } else if change.changed {
                println!("Timer started: {} ({})", change.task.description, change.task.id);
            } else if change.task.completed {
                println!("Task already completed: {}", change.task.id);
            } else {
                println!("Timer already running: {}", change.task.id);
            }
        }
        Command::Pause { id, note } => {
            let mut checkpoint = CliCheckpoint::default();
            let change = task_api::pause_timer(&id, &mut checkpoint)?;
            let assessment = match (checkpoint.paused.as_ref(), note.as_deref()) {
                (Some(task), Some(note)) if !task.is_goal => {
                    Some(task_api::assess_progress(&task.id, note, &[], &runtime.assistant())?)
                }
                _ => None,
            };

            if json {
                print_json(&serde_json::json!({
                    "timer": change,
                    "assessment": assessment,
                }))?;
                return Ok(());
            }

            match change.committed_ms {
                Some(committed) => println!(
                    "Timer paused: +{} (total {})",
                    format_duration(committed),
                    format_duration(change.task.timer.elapsed_time)
                ),
                None => println!("Timer was not running: {}", change.task.id),
            }
            match (&assessment, checkpoint.paused) {
                (Some(outcome), _) => {
                    print_applied(outcome, |outcome| print_assessment(outcome, palette))
                }
                (None, Some(task)) if !task.is_goal => println!(
                    "How is it going? Run: petquest progress {} \"what you did\"",
                    task.id
                ),
                _ => {}
            }
        }
        Command::Goal { command } => run_goal(command, &runtime, json)?,
        Command::Pet { command } => run_pet(command, json)?,
        Command::Shop { command } => match command {
            ShopCommand::List { category } => {
                let category = category
                    .as_deref()
                    .map(pet_api::parse_category)
                    .transpose()?;
                let items = pet_api::catalog(category);
                if json {
                    print_json(&items)?;
                } else {
                    let rows: Vec<ShopRow> = items.into_iter().map(ShopRow::from).collect();
                    let table = Table::new(rows).with(Style::sharp()).to_string();
                    println!("{table}");
                }
            }
            ShopCommand::Buy { item } => {
                let outcome = pet_api::buy_item(&item)?;
                if json {
                    print_json(&outcome)?;
                } else {
                    println!(
                        "Bought {} for {} coins. {} coins left.",
                        outcome.item_id, outcome.price, outcome.coins_left
                    );
                }
            }
        },
        Command::Notify => {
            let outcome = task_api::notify_reminders()?;
            for failure in &outcome.failures {
                eprintln!(
                    "WARNING: notification for {} failed: {}",
                    failure.task_id, failure.error
                );
            }
            if json {
                let failed: Vec<_> = outcome
                    .failures
                    .iter()
                    .map(|failure| {
                        serde_json::json!({
                            "task_id": failure.task_id,
                            "error": failure.error.to_string(),
                        })
                    })
                    .collect();
                print_json(&serde_json::json!({
                    "sent": outcome.reminders,
                    "failed": failed,
                }))?;
            } else {
                println!("Sent {} reminder(s).", outcome.reminders.len());
            }
        }
    }

    Ok(())
}

fn run_subtask(command: SubtaskCommand, runtime: &Runtime, json: bool) -> Result<(), AppError> {
    match command {
        SubtaskCommand::Generate { id } => {
            let outcome = task_api::generate_subtasks(&id, &runtime.assistant())?;
            if json {
                print_json(&outcome)?;
            } else {
                print_applied(&outcome, |subtasks| print_subtasks(subtasks));
            }
        }
        SubtaskCommand::Add { id, text } => {
            let subtask = task_api::add_subtask(&id, &text)?;
            if json {
                print_json(&subtask)?;
            } else {
                println!("Added subtask: {} ({})", subtask.text, subtask.id);
            }
        }
        SubtaskCommand::Edit {
            id,
            subtask_id,
            text,
        } => {
            let edit = task_api::edit_subtask(&id, &subtask_id, &text)?;
            if json {
                print_json(&edit)?;
            } else {
                match edit {
                    TextEdit::Renamed(subtask) => {
                        println!("Renamed subtask: {} ({})", subtask.text, subtask.id)
                    }
                    TextEdit::Removed(subtask) => {
                        println!("Deleted subtask: {} ({})", subtask.text, subtask.id)
                    }
                }
            }
        }
        SubtaskCommand::Delete { id, subtask_id } => {
            let removal = task_api::delete_subtask(&id, &subtask_id)?;
            if json {
                print_json(&removal)?;
            } else {
                println!(
                    "Deleted subtask: {} ({})",
                    removal.removed.text, removal.removed.id
                );
                if let Some(reward) = &removal.completion {
                    print_completion(reward);
                }
            }
        }
        SubtaskCommand::Toggle { id, subtask_id } => {
            let outcome = task_api::toggle_subtask(&id, &subtask_id)?;
            if json {
                print_json(&outcome)?;
            } else {
                let mark = if outcome.subtask.completed { "x" } else { " " };
                println!(
                    "[{mark}] {} - progress {}%",
                    outcome.subtask.text, outcome.progress
                );
                if let Some(reward) = &outcome.completion {
                    print_completion(reward);
                }
            }
        }
    }
    Ok(())
}

fn run_goal(command: GoalCommand, runtime: &Runtime, json: bool) -> Result<(), AppError> {
    match command {
        GoalCommand::Proof { id, file, text } => {
            let proof = match (file, text) {
                (Some(path), _) => Proof::from_path(&path)?,
                (None, Some(text)) => Proof::Text(text),
                (None, None) => {
                    return Err(AppError::invalid_input("a proof file or --text is required"));
                }
            };
            let outcome = task_api::submit_goal_proof(&id, &proof, &runtime.assistant())?;
            if json {
                print_json(&outcome)?;
            } else {
                print_applied(&outcome, |outcome| match &outcome.completion {
                    Some(completion) => {
                        println!("Proof accepted: {}", outcome.verdict.message);
                        print_goal_completion(completion);
                    }
                    None => println!("Proof rejected: {}", outcome.verdict.message),
                });
            }
        }
        GoalCommand::Skip { id } => {
            let completion = task_api::skip_goal(&id)?;
            if json {
                print_json(&completion)?;
            } else {
                println!("Goal marked done without proof.");
                print_goal_completion(&completion);
            }
        }
        GoalCommand::History { id } => {
            let history = task_api::goal_history(&id)?;
            if json {
                print_json(&history)?;
                return Ok(());
            }
            let offset = Clock::system().offset;
            println!(
                "{} ({}): {} day streak",
                history.description, history.task_id, history.streak
            );
            if history.entries.is_empty() {
                println!("  no completions yet");
            }
            for entry in &history.entries {
                let how = if entry.skipped { "skipped" } else { "proof" };
                println!("  {} {how}", format_local(entry.date, offset));
            }
        }
    }
    Ok(())
}

fn run_pet(command: PetCommand, json: bool) -> Result<(), AppError> {
    match command {
        PetCommand::Show => {
            let status = pet_api::pet_status()?;
            if json {
                print_json(&status)?;
                return Ok(());
            }
            let pet = &status.pet;
            println!("{} the {} ({} coins)", pet.name, status.stage_name, pet.coins);
            println!("  health    {:>3.0}/{:.0}", pet.health, pet.max_health);
            println!("  happiness {:>3.0}/{:.0}", pet.happiness, pet.max_happiness);
            println!("  hunger    {:>3.0}/100", pet.hunger);
            println!("  energy    {:>3.0}/100", pet.energy);
            println!(
                "  tasks done: {}, items used: {}, time focused: {}",
                pet.total_tasks_completed,
                pet.items_used,
                format_duration(pet.total_time_spent)
            );
            if !pet.inventory.is_empty() {
                println!("  inventory: {}", pet.inventory.join(", "));
            }
            if !pet.active_items.is_empty() {
                println!("  wearing: {}", pet.active_items.join(", "));
            }
            if pet.growth_stage < economy::MAX_GROWTH_STAGE {
                println!(
                    "  next stage: {}",
                    economy::growth_stage_name(pet.growth_stage + 1)
                );
            }
        }
        PetCommand::Rename { name } => {
            let pet = pet_api::rename_pet(&name)?;
            if json {
                print_json(&pet)?;
            } else {
                println!("Your pet is now called {}.", pet.name);
            }
        }
        PetCommand::Equip { item } => {
            let outcome = pet_api::equip_item(&item)?;
            if json {
                print_json(&outcome)?;
            } else if outcome.active {
                println!("Equipped {}.", outcome.item_id);
            } else {
                println!("Unequipped {}.", outcome.item_id);
            }
        }
    }
    Ok(())
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn is_informational(err: &clap::Error) -> bool {
    matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;
    let mut quoted_token = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            quoted_token = true;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() || quoted_token {
                args.push(std::mem::take(&mut current));
            }
            quoted_token = false;
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() || quoted_token {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_interactive() -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("petquest".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) if is_informational(&err) => {
                let _ = err.print();
                continue;
            }
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = run_command(cli) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn main() {
    init_tracing();

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_interactive() {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if is_informational(&err) => {
            let _ = err.print();
            return;
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
