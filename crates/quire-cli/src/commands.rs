use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use tracing::warn;

use quire_events::EventBroadcaster;
use quire_gate::{CommentPipeline, CommentSubmission, GateConfig, SubmissionOutcome};
use quire_moderation::{ModerationAction, ModerationFailure, ModerationSummary, ResponseModerator};
use quire_store::{sidecar, EntryFilter, Fetcher, FileStore};
use quire_types::{
    keys, BlogConfig, Category, CategoryPath, Entry, EntryRef, Metadata, Response, ResponseId,
    ResponseStatus,
};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let out = cli.format;
    match cli.command {
        Command::Init(args) => cmd_init(&cli.config, args, out),
        Command::Category { action } => cmd_category(&open(&cli.config)?, action, out),
        Command::Entry { action } => cmd_entry(&open(&cli.config)?, action, out),
        Command::Comment { action } => cmd_comment(open(&cli.config)?, action, out),
        Command::Moderate { action } => cmd_moderate(open(&cli.config)?, action, out),
    }
}

fn open(config: &Path) -> anyhow::Result<Arc<dyn Fetcher>> {
    let store = FileStore::from_properties_file(config)
        .with_context(|| format!("opening blog from {}", config.display()))?;
    Ok(Arc::new(store))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn entry_ref(category: &str, permalink: &str) -> anyhow::Result<EntryRef> {
    Ok(EntryRef::new(CategoryPath::parse(category)?, permalink)?)
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn cmd_init(config_path: &Path, args: InitArgs, out: OutputFormat) -> anyhow::Result<()> {
    if config_path.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", config_path.display());
    }
    fs::create_dir_all(&args.home)
        .with_context(|| format!("creating blog home {}", args.home.display()))?;
    let home = fs::canonicalize(&args.home)?;

    let mut config = BlogConfig::new(&home);
    config.comment_throttle_minutes = args.throttle;
    config.comment_expiration_days = args.expire_days.filter(|d| *d > 0);
    config.comment_autoformat = args.autoformat;
    sidecar::save_blog_config(config_path, &config)?;

    if out == OutputFormat::Json {
        return print_json(&config);
    }
    println!("{} Initialized blog in {}", "✓".green().bold(), home.display().to_string().bold());
    println!("  Properties: {}", config_path.display());
    match config.comment_throttle_minutes {
        Some(m) => println!("  Comment throttle: {} min", m.to_string().cyan()),
        None => println!("  Comment throttle: {}", "off".dimmed()),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// category
// ---------------------------------------------------------------------------

fn cmd_category(store: &Arc<dyn Fetcher>, action: CategoryAction, out: OutputFormat) -> anyhow::Result<()> {
    match action {
        CategoryAction::Add { path, name, description } => {
            let mut category = Category::new(CategoryPath::parse(&path)?);
            if let Some(name) = name {
                category.metadata.insert(keys::CATEGORY_NAME.to_string(), name);
            }
            if let Some(description) = description {
                category
                    .metadata
                    .insert(keys::CATEGORY_DESCRIPTION.to_string(), description);
            }
            let path = store.save_category(&mut category)?;
            if out == OutputFormat::Json {
                return print_json(&category);
            }
            println!("{} Saved category {}", "✓".green().bold(), path.to_string().yellow());
        }
        CategoryAction::Delete { path } => {
            let path = CategoryPath::parse(&path)?;
            store.delete_category(&path)?;
            println!("Deleted category {}", path.to_string().yellow());
        }
        CategoryAction::List => {
            let categories = store.list_categories()?;
            if out == OutputFormat::Json {
                return print_json(&categories);
            }
            for category in &categories {
                match category.description() {
                    Some(d) => println!("{}  {}  {}", category.path.to_string().yellow(), category.display_name(), d.dimmed()),
                    None => println!("{}  {}", category.path.to_string().yellow(), category.display_name()),
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// entry
// ---------------------------------------------------------------------------

fn cmd_entry(store: &Arc<dyn Fetcher>, action: EntryAction, out: OutputFormat) -> anyhow::Result<()> {
    match action {
        EntryAction::Add(args) => {
            let body = match (&args.body, &args.body_file) {
                (Some(body), _) => body.clone(),
                (None, Some(file)) => fs::read_to_string(file)
                    .with_context(|| format!("reading {}", file.display()))?,
                (None, None) => String::new(),
            };
            if args.title.trim().is_empty() && body.trim().is_empty() {
                bail!("an entry needs a title or a body");
            }
            let mut entry = Entry::new(CategoryPath::parse(&args.category)?, args.title, body);
            entry.metadata = parse_metadata(&args.metadata)?;
            let key = store.save_entry(&mut entry)?;
            if out == OutputFormat::Json {
                return print_json(&entry);
            }
            println!("{} Saved entry {}", "✓".green().bold(), key.to_string().yellow());
        }
        EntryAction::Show { category, permalink } => {
            let entry = store.load_entry(&entry_ref(&category, &permalink)?)?;
            if out == OutputFormat::Json {
                return print_json(&entry);
            }
            print_entry(&entry);
        }
        EntryAction::Delete { category, permalink } => {
            let key = entry_ref(&category, &permalink)?;
            store.delete_entry(&key)?;
            println!("Deleted entry {}", key.to_string().yellow());
        }
        EntryAction::List { category, limit } => {
            let mut filter = match category {
                Some(c) => EntryFilter::category(CategoryPath::parse(&c)?),
                None => EntryFilter::all(),
            };
            filter.limit = limit;
            let entries = store.fetch_entries(&filter)?;
            if out == OutputFormat::Json {
                return print_json(&entries);
            }
            for entry in &entries {
                println!(
                    "{}  {}  {}  ({} comments)",
                    entry.created.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                    entry.id().unwrap_or_default().yellow(),
                    entry.title,
                    entry.comments.len()
                );
            }
        }
    }
    Ok(())
}

fn parse_metadata(pairs: &[String]) -> anyhow::Result<Metadata> {
    let mut metadata = Metadata::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("metadata must be key=value, got '{pair}'");
        };
        metadata.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(metadata)
}

fn print_entry(entry: &Entry) {
    println!("{}", entry.title.bold());
    println!("{}", entry.id().unwrap_or_default().yellow());
    println!(
        "Created {}  Modified {}",
        entry.created.to_rfc3339(),
        entry.modified.to_rfc3339()
    );
    if !entry.supports_comments() || entry.comments_disabled() {
        println!("{}", "comments closed".red());
    }
    println!("\n{}\n", entry.body);
    for comment in &entry.comments {
        println!("  {} {} [{}]", "-".dimmed(), comment.author.bold(), status_label(comment.status()));
        println!("    {}", comment.body);
    }
    for trackback in &entry.trackbacks {
        println!("  {} trackback {} [{}]", "-".dimmed(), trackback.url.blue(), status_label(trackback.status()));
    }
    for pingback in &entry.pingbacks {
        println!("  {} pingback {} [{}]", "-".dimmed(), pingback.url.blue(), status_label(pingback.status()));
    }
}

fn status_label(status: ResponseStatus) -> colored::ColoredString {
    match status {
        ResponseStatus::New => status.as_str().yellow(),
        ResponseStatus::Approved => status.as_str().green(),
        ResponseStatus::Spam => status.as_str().red(),
    }
}

// ---------------------------------------------------------------------------
// comment
// ---------------------------------------------------------------------------

fn cmd_comment(store: Arc<dyn Fetcher>, action: CommentAction, out: OutputFormat) -> anyhow::Result<()> {
    match action {
        CommentAction::Submit(args) => {
            let gate_config = GateConfig::from_properties(&store.config().extra);
            let pipeline = CommentPipeline::with_default_stages(
                Arc::clone(&store),
                Arc::new(EventBroadcaster::new()),
                &gate_config,
            );
            let submission = CommentSubmission::new(args.category, args.permalink, args.author, args.body)
                .with_email(args.email)
                .with_url(args.url)
                .from_ip(args.ip);
            match pipeline.submit(submission) {
                SubmissionOutcome::Accepted { id, comment } => {
                    if out == OutputFormat::Json {
                        return print_json(&comment);
                    }
                    println!("{} Comment stored as {}", "✓".green().bold(), id.to_string().yellow());
                    println!("  Status: {}", status_label(comment.status()));
                }
                SubmissionOutcome::Dropped { stage, reason } => {
                    println!("{} Comment dropped at {}: {}", "✗".red().bold(), stage.bold(), reason);
                }
            }
        }
        CommentAction::List { category, permalink } => {
            let comments = store.list_comments(&entry_ref(&category, &permalink)?)?;
            if out == OutputFormat::Json {
                return print_json(&comments);
            }
            for comment in &comments {
                println!(
                    "{}  {}  {} [{}]",
                    comment.date.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                    comment.id.as_deref().unwrap_or("?").yellow(),
                    comment.author.bold(),
                    status_label(comment.status())
                );
                println!("    {}", comment.body);
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// moderate
// ---------------------------------------------------------------------------

fn cmd_moderate(store: Arc<dyn Fetcher>, action: ModerateAction, out: OutputFormat) -> anyhow::Result<()> {
    let moderator = ResponseModerator::new(store, Arc::new(EventBroadcaster::new()));
    let (raw, action) = match action {
        ModerateAction::Pending => {
            let pending: Vec<String> = moderator.pending()?.iter().map(ToString::to_string).collect();
            if out == OutputFormat::Json {
                return print_json(&pending);
            }
            if pending.is_empty() {
                println!("Nothing awaiting moderation.");
            }
            for id in &pending {
                println!("{id}");
            }
            return Ok(());
        }
        ModerateAction::Approve { ids } => (ids, ModerationAction::SetStatus(ResponseStatus::Approved)),
        ModerateAction::Spam { ids } => (ids, ModerationAction::SetStatus(ResponseStatus::Spam)),
        ModerateAction::Reset { ids } => (ids, ModerationAction::SetStatus(ResponseStatus::New)),
        ModerateAction::Delete { ids } => (ids, ModerationAction::Delete),
    };

    let (ids, bad) = parse_ids(&raw);
    let mut summary = moderator.apply(&ids, action);
    summary.failures.extend(bad);
    if out == OutputFormat::Json {
        return print_json(&summary);
    }
    print_summary(&summary);
    Ok(())
}

fn parse_ids(raw: &[String]) -> (Vec<ResponseId>, Vec<ModerationFailure>) {
    let mut ids = Vec::new();
    let mut bad = Vec::new();
    for text in raw {
        match text.parse::<ResponseId>() {
            Ok(id) => ids.push(id),
            Err(e) => {
                warn!(id = %text, error = %e, "skipping unparsable response id");
                bad.push(ModerationFailure {
                    id: text.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    (ids, bad)
}

fn print_summary(summary: &ModerationSummary) {
    println!("{} {}", "✓".green().bold(), summary.message());
    for failure in &summary.failures {
        println!("  {} {}: {}", "✗".red(), failure.id.yellow(), failure.reason);
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn run(args: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec!["quire"];
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv)?)
    }

    // ---------------------------------------------------------------
    // Argument helpers
    // ---------------------------------------------------------------

    #[test]
    fn metadata_pairs_are_split_on_first_equals() {
        let meta = parse_metadata(&["mood = happy".into(), "link=a=b".into()]).unwrap();
        assert_eq!(meta.get("mood").map(String::as_str), Some("happy"));
        assert_eq!(meta.get("link").map(String::as_str), Some("a=b"));
        assert!(parse_metadata(&["nope".into()]).is_err());
    }

    #[test]
    fn bad_ids_become_failures() {
        let (ids, bad) = parse_ids(&["not-an-id".to_string()]);
        assert!(ids.is_empty());
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].id, "not-an-id");
    }

    // ---------------------------------------------------------------
    // End to end
    // ---------------------------------------------------------------

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let props = dir.path().join("blog.properties");
        let home = dir.path().join("home");
        let (props, home) = (props.to_str().unwrap(), home.to_str().unwrap());

        run(&["-c", props, "init", home]).unwrap();
        assert!(run(&["-c", props, "init", home]).is_err());
        run(&["-c", props, "init", home, "--force", "--throttle", "10"]).unwrap();

        let config = sidecar::load_blog_config(Path::new(props)).unwrap();
        assert_eq!(config.comment_throttle_minutes, Some(10));
    }

    #[test]
    fn submit_and_moderate_a_comment() {
        let dir = tempfile::tempdir().unwrap();
        let props = dir.path().join("blog.properties");
        let home = dir.path().join("home");
        let (props, home) = (props.to_str().unwrap(), home.to_str().unwrap());

        run(&["-c", props, "init", home]).unwrap();
        run(&["-c", props, "category", "add", "news", "--name", "News"]).unwrap();
        run(&["-c", props, "entry", "add", "--category", "news", "--title", "Post", "--body", "hi"]).unwrap();
        run(&[
            "-c", props, "comment", "submit", "--category", "news", "--permalink", "post.txt",
            "--author", "Jane", "--body", "Nice post",
        ])
        .unwrap();

        let store = open(Path::new(props)).unwrap();
        let entry = EntryRef::new(CategoryPath::parse("news").unwrap(), "post.txt").unwrap();
        let comments = store.list_comments(&entry).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].status(), ResponseStatus::New);

        let id = ResponseId::new(entry.clone(), comments[0].id.clone().unwrap()).unwrap();
        run(&["-c", props, "moderate", "approve", &id.to_string(), "bogus"]).unwrap();
        assert_eq!(store.load_comment(&id).unwrap().status(), ResponseStatus::Approved);

        run(&["-c", props, "moderate", "delete", &id.to_string()]).unwrap();
        assert!(store.list_comments(&entry).unwrap().is_empty());
    }

    #[test]
    fn commands_need_a_properties_file() {
        let dir = tempfile::tempdir().unwrap();
        let props = dir.path().join("missing.properties");
        assert!(run(&["-c", props.to_str().unwrap(), "category", "list"]).is_err());
    }
}
