use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use crate::cli::Invocation;
use crate::config::Config;
use crate::datetime;
use crate::form::{Outcome, TaskForm};
use crate::render::Renderer;
use crate::repo::Repository;
use crate::store::TaskStore;
use crate::task::{Priority, Recurrence, TaskFields};
use crate::view::{self, Criteria};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add",
        "modify",
        "toggle",
        "delete",
        "list",
        "info",
        "stats",
        "theme",
        "_commands",
        "_show",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
    store: &TaskStore,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let today = datetime::today(datetime::resolve_timezone(cfg));
    seed_welcome(store, today)?;

    let command = inv.command.as_str();
    debug!(command, args = ?inv.args, "dispatching command");

    match command {
        "add" => cmd_add(store, &inv.args, today),
        "modify" => cmd_modify(store, &inv.args, today),
        "toggle" => cmd_toggle(store, &inv.args),
        "delete" => cmd_delete(store, &inv.args),
        "list" => cmd_list(store, renderer, &inv.args, today),
        "info" => cmd_info(store, renderer, &inv.args),
        "stats" => cmd_stats(store, renderer, today),
        "theme" => cmd_theme(store, renderer, &inv.args),
        "_commands" => cmd_commands(),
        "_show" => cmd_show(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

// An empty collection at startup gets a welcome task, so the first list is
// never blank.
#[instrument(skip(store, today))]
pub fn seed_welcome(store: &TaskStore, today: NaiveDate) -> anyhow::Result<()> {
    let mut repo = Repository::load(store)?;
    if !repo.tasks().is_empty() {
        return Ok(());
    }

    info!("collection empty; seeding welcome task");
    repo.create(TaskFields {
        title: "Welcome to TaskBoard".to_string(),
        description: "Add, edit, and organize your tasks.".to_string(),
        due: Some(today),
        priority: Priority::High,
        recurring: Recurrence::None,
    })?;
    Ok(())
}

#[instrument(skip(store, args, today))]
fn cmd_add(store: &TaskStore, args: &[String], today: NaiveDate) -> anyhow::Result<()> {
    info!("command add");

    let mut repo = Repository::load(store)?;
    let (title, mods) = parse_title_and_fields(args, today)?;

    let mut form = TaskForm::new();
    form.fields_mut().title = title;
    apply_field_mods(form.fields_mut(), &mods);

    match form.submit(&mut repo)? {
        Outcome::Created(id) => println!("Created task {id}."),
        Outcome::Rejected => debug!("add rejected: empty title"),
        outcome => debug!(?outcome, "unexpected add outcome"),
    }
    Ok(())
}

#[instrument(skip(store, args, today))]
fn cmd_modify(store: &TaskStore, args: &[String], today: NaiveDate) -> anyhow::Result<()> {
    info!("command modify");

    let Some((id_token, rest)) = args.split_first() else {
        return Err(anyhow!("modify requires a task id"));
    };
    let id: u64 = id_token
        .parse()
        .with_context(|| format!("invalid task id: {id_token}"))?;

    let mut repo = Repository::load(store)?;
    let mut form = TaskForm::new();
    match repo.get(id) {
        Some(task) => {
            let task = task.clone();
            form.begin_edit(&task);
        }
        None => {
            debug!(id, "modify target not found; no-op");
            return Ok(());
        }
    }

    let (title, mods) = parse_title_and_fields(rest, today)?;
    if !title.is_empty() {
        form.fields_mut().title = title;
    }
    apply_field_mods(form.fields_mut(), &mods);

    match form.submit(&mut repo)? {
        Outcome::Updated(id) => println!("Modified task {id}."),
        Outcome::Rejected => debug!("modify rejected: empty title"),
        outcome => debug!(?outcome, "unexpected modify outcome"),
    }
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_toggle(store: &TaskStore, args: &[String]) -> anyhow::Result<()> {
    info!("command toggle");

    let id = parse_id_arg(args, "toggle")?;
    let mut repo = Repository::load(store)?;

    if repo.toggle_completed(id)? {
        let completed = repo.get(id).map(|task| task.completed).unwrap_or(false);
        if completed {
            println!("Completed task {id}.");
        } else {
            println!("Reopened task {id}.");
        }
    } else {
        debug!(id, "toggle target not found; no-op");
    }
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_delete(store: &TaskStore, args: &[String]) -> anyhow::Result<()> {
    info!("command delete");

    let id = parse_id_arg(args, "delete")?;
    let mut repo = Repository::load(store)?;

    if repo.delete(id)? {
        println!("Deleted task {id}.");
    } else {
        debug!(id, "delete target not found; no-op");
    }
    Ok(())
}

#[instrument(skip(store, renderer, args, today))]
fn cmd_list(
    store: &TaskStore,
    renderer: &mut Renderer,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command list");

    let criteria = Criteria::parse(args)?;
    let repo = Repository::load(store)?;
    let projection = view::project(repo.tasks(), &criteria, today);
    renderer.print_projection(&projection)?;
    Ok(())
}

#[instrument(skip(store, renderer, args))]
fn cmd_info(store: &TaskStore, renderer: &mut Renderer, args: &[String]) -> anyhow::Result<()> {
    info!("command info");

    let id = parse_id_arg(args, "info")?;
    let repo = Repository::load(store)?;

    let Some(task) = repo.get(id) else {
        return Err(anyhow!("no such task: {id}"));
    };
    renderer.print_task_info(task)?;
    Ok(())
}

#[instrument(skip(store, renderer, today))]
fn cmd_stats(store: &TaskStore, renderer: &mut Renderer, today: NaiveDate) -> anyhow::Result<()> {
    info!("command stats");

    let repo = Repository::load(store)?;
    renderer.print_stats(&view::stats(repo.tasks(), today))?;
    Ok(())
}

#[instrument(skip(store, renderer, args))]
fn cmd_theme(store: &TaskStore, renderer: &mut Renderer, args: &[String]) -> anyhow::Result<()> {
    info!("command theme");

    if args.is_empty() {
        let active = store.get_theme()?.unwrap_or_default();
        println!("{active}");
        return Ok(());
    }

    let request = args[0].to_ascii_lowercase();
    let next = match request.as_str() {
        "toggle" => store.get_theme()?.unwrap_or_default().toggled(),
        _ => request.parse()?,
    };

    store.set_theme(next)?;
    renderer.set_theme(next);
    println!("Theme set: {next}");
    Ok(())
}

fn cmd_commands() -> anyhow::Result<()> {
    for command in known_command_names() {
        println!("{command}");
    }
    Ok(())
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    for (k, v) in cfg.iter() {
        println!("{k}={v}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "Implemented commands: add, modify, toggle, delete, list, info, stats, theme, version"
    );
    Ok(())
}

fn parse_id_arg(args: &[String], command: &str) -> anyhow::Result<u64> {
    let Some(token) = args.first() else {
        return Err(anyhow!("{command} requires a task id"));
    };
    token
        .parse()
        .with_context(|| format!("invalid task id: {token}"))
}

#[derive(Debug, Clone)]
enum FieldMod {
    Description(String),
    Due(Option<NaiveDate>),
    Priority(Priority),
    Recurring(Recurrence),
}

// Positional words form the title; key:value tokens set the other fields.
// A literal "--" stops field parsing so titles may contain colons.
#[instrument(skip(args, today))]
fn parse_title_and_fields(
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<(String, Vec<FieldMod>)> {
    let mut title_parts = Vec::new();
    let mut mods = Vec::new();

    let mut literal = false;
    for arg in args {
        if arg == "--" {
            literal = true;
            continue;
        }

        if !literal && let Some(one_mod) = parse_one_field(arg, today)? {
            mods.push(one_mod);
            continue;
        }

        title_parts.push(arg.clone());
    }

    Ok((title_parts.join(" "), mods))
}

fn parse_one_field(tok: &str, today: NaiveDate) -> anyhow::Result<Option<FieldMod>> {
    let (key, value) = if let Some((k, v)) = tok.split_once(':') {
        (k, v)
    } else if let Some((k, v)) = tok.split_once('=') {
        (k, v)
    } else {
        return Ok(None);
    };

    match key.to_ascii_lowercase().as_str() {
        "desc" | "description" => Ok(Some(FieldMod::Description(value.to_string()))),
        "due" => Ok(Some(FieldMod::Due(datetime::parse_due_expr(value, today)?))),
        "pri" | "priority" => Ok(Some(FieldMod::Priority(value.parse()?))),
        "repeat" | "recur" | "recurring" => Ok(Some(FieldMod::Recurring(value.parse()?))),
        _ => Ok(None),
    }
}

fn apply_field_mods(fields: &mut TaskFields, mods: &[FieldMod]) {
    for one_mod in mods {
        match one_mod {
            FieldMod::Description(text) => fields.description = text.clone(),
            FieldMod::Due(date) => fields.due = *date,
            FieldMod::Priority(priority) => fields.priority = *priority,
            FieldMod::Recurring(recurring) => fields.recurring = *recurring,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::{
        apply_field_mods, expand_command_abbrev, known_command_names, parse_title_and_fields,
        seed_welcome,
    };
    use crate::repo::Repository;
    use crate::store::TaskStore;
    use crate::task::{Priority, Recurrence, TaskFields};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn abbreviations_expand_unambiguous_prefixes() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("del", &known), Some("delete"));
        assert_eq!(expand_command_abbrev("li", &known), Some("list"));
        assert_eq!(expand_command_abbrev("toggle", &known), Some("toggle"));
        // ambiguous between toggle and theme
        assert_eq!(expand_command_abbrev("t", &known), None);
    }

    #[test]
    fn title_and_field_tokens_separate() {
        let args: Vec<String> = [
            "Pay",
            "rent",
            "due:2026-03-01",
            "pri:high",
            "repeat:monthly",
            "desc:first of the month",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        let (title, mods) =
            parse_title_and_fields(&args, day(2026, 2, 16)).expect("parse");
        assert_eq!(title, "Pay rent");

        let mut fields = TaskFields::default();
        apply_field_mods(&mut fields, &mods);
        assert_eq!(fields.due, Some(day(2026, 3, 1)));
        assert_eq!(fields.priority, Priority::High);
        assert_eq!(fields.recurring, Recurrence::Monthly);
        assert_eq!(fields.description, "first of the month");
    }

    #[test]
    fn literal_marker_keeps_colon_words_in_the_title() {
        let args: Vec<String> = ["--", "re: planning"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let (title, mods) = parse_title_and_fields(&args, day(2026, 2, 16)).expect("parse");
        assert_eq!(title, "re: planning");
        assert!(mods.is_empty());
    }

    #[test]
    fn welcome_task_seeds_only_an_empty_collection() {
        let temp = tempdir().expect("tempdir");
        let store = TaskStore::open(temp.path()).expect("open store");
        let today = day(2026, 2, 16);

        seed_welcome(&store, today).expect("seed");
        let repo = Repository::load(&store).expect("load");
        assert_eq!(repo.tasks().len(), 1);
        assert_eq!(repo.tasks()[0].title, "Welcome to TaskBoard");
        assert_eq!(repo.tasks()[0].due, Some(today));

        seed_welcome(&store, today).expect("seed again");
        let repo = Repository::load(&store).expect("reload");
        assert_eq!(repo.tasks().len(), 1);
    }
}
