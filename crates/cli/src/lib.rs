use anyhow::{bail, Context as AnyhowContext, Result};
use backend::Backend;
use caption_dataset::{
    import_directory, plan_export, write_export_file, write_plan, ExportSummary, ScanOptions,
};
use caption_engine::{
    BulkOutcome, EngineConfig, EngineState, InsertPosition, Item, ItemId, Operation, PatternSpec,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use output::{print_json, print_stdout};
use serde_json::json;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

mod backend;
mod confirm;
mod output;

#[derive(Parser)]
#[command(name = "captioner")]
#[command(about = "Keep image captions and their tags consistent", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Local collection snapshot
    #[arg(
        long,
        global = true,
        env = "CAPTIONER_STORE",
        default_value = "captions.json"
    )]
    store: PathBuf,

    /// Base URL of a remote image API; used instead of --store
    #[arg(long, global = true, env = "CAPTIONER_REMOTE")]
    remote: Option<String>,

    /// Engine settings file (TOML)
    #[arg(long, global = true, env = "CAPTIONER_CONFIG")]
    config: Option<PathBuf>,

    /// Answer yes to confirmation prompts
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    /// Output JSON format
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import images and their sibling .txt captions from a directory
    Import(ImportArgs),

    /// List items with their captions
    List(ListArgs),

    /// Show the tag index, most used first
    Tags(TagsArgs),

    /// Show one item with its tags
    Show(ItemArgs),

    /// Captioning progress and tag totals
    Stats,

    /// Replace the caption of one item
    #[command(name = "set-caption")]
    SetCaption(SetCaptionArgs),

    /// Remove a tag from every caption
    #[command(name = "delete-tag")]
    DeleteTag(DeleteTagArgs),

    /// Rename a tag in every caption (first occurrence per caption)
    #[command(name = "rename-tag")]
    RenameTag(RenameTagArgs),

    /// Find and replace text in every caption
    Replace(ReplaceArgs),

    /// Insert text next to the first match in every caption
    Insert(InsertArgs),

    /// Delete matching text from every caption and tidy the commas
    #[command(name = "delete-text")]
    DeleteText(DeleteTextArgs),

    /// Append text to every caption
    Append(AppendArgs),

    /// Step through the items that carry a tag
    Matches(MatchesArgs),

    /// Remove one item from the collection
    Remove(ItemArgs),

    /// Remove every item from the collection
    Clear,

    /// Write images and caption files into a directory
    Export(ExportArgs),
}

#[derive(Args)]
struct ImportArgs {
    /// Directory holding images and .txt captions
    dir: PathBuf,

    /// Include subdirectories
    #[arg(long, short = 'r')]
    recursive: bool,
}

#[derive(Args)]
struct ListArgs {
    /// Only items without a caption
    #[arg(long)]
    uncaptioned: bool,
}

#[derive(Args)]
struct TagsArgs {
    /// Maximum number of tags to show
    #[arg(long, short = 'n')]
    limit: Option<usize>,
}

#[derive(Args)]
struct ItemArgs {
    /// Item id
    id: String,
}

#[derive(Args)]
struct SetCaptionArgs {
    /// Item id
    id: String,

    /// New caption
    caption: String,
}

#[derive(Args)]
struct BulkFlags {
    /// Report what would change without writing anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct PatternFlags {
    /// Treat the pattern as a regular expression
    #[arg(long)]
    regex: bool,

    /// Match case exactly; without it literal text matches ignoring case
    ///
    /// This applies to `replace`, `insert` and the deletion step of
    /// `delete-text`. `delete-text` always picks literal candidates by exact,
    /// case-sensitive substring.
    #[arg(long)]
    case_sensitive: bool,
}

impl PatternFlags {
    fn spec(&self, text: String) -> PatternSpec {
        let spec = if self.regex {
            PatternSpec::regex(text)
        } else {
            PatternSpec::literal(text)
        };
        spec.case_sensitive(self.case_sensitive)
    }
}

#[derive(Args)]
struct DeleteTagArgs {
    tag: String,

    #[command(flatten)]
    bulk: BulkFlags,
}

#[derive(Args)]
struct RenameTagArgs {
    old: String,

    new: String,

    #[command(flatten)]
    bulk: BulkFlags,
}

#[derive(Args)]
struct ReplaceArgs {
    /// Text or pattern to find
    pattern: String,

    /// Replacement; with --regex, `$1` refers to capture groups
    replacement: String,

    #[command(flatten)]
    pattern_flags: PatternFlags,

    #[command(flatten)]
    bulk: BulkFlags,
}

#[derive(Clone, Copy, ValueEnum)]
enum Position {
    Before,
    After,
}

impl From<Position> for InsertPosition {
    fn from(value: Position) -> Self {
        match value {
            Position::Before => InsertPosition::Prepend,
            Position::After => InsertPosition::Append,
        }
    }
}

#[derive(Args)]
struct InsertArgs {
    /// Text or pattern to insert next to
    target: String,

    /// Text to insert
    text: String,

    /// Side of the match to insert on
    #[arg(long, value_enum, default_value = "before")]
    position: Position,

    /// Skip captions where the text already sits next to the match
    #[arg(long)]
    if_absent: bool,

    #[command(flatten)]
    pattern_flags: PatternFlags,

    #[command(flatten)]
    bulk: BulkFlags,
}

#[derive(Args)]
struct DeleteTextArgs {
    /// Text (whole words) or pattern to delete
    target: String,

    #[command(flatten)]
    pattern_flags: PatternFlags,

    #[command(flatten)]
    bulk: BulkFlags,
}

#[derive(Args)]
struct AppendArgs {
    /// Text appended as a new caption segment
    text: String,

    #[command(flatten)]
    bulk: BulkFlags,
}

#[derive(Args)]
struct MatchesArgs {
    /// Exact tag to look for
    tag: String,

    /// Show only the n-th match (1-based, wraps around)
    #[arg(long)]
    at: Option<usize>,
}

#[derive(Args)]
struct ExportArgs {
    /// Output directory (created when missing)
    out: PathBuf,
}

struct RunContext {
    json: bool,
    yes: bool,
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    // stdout is reserved for JSON
    init_logging(cli.verbose, cli.quiet || cli.json);

    let config = load_config(cli.config.as_deref())?;
    let backend = Backend::open(&cli.store, cli.remote.as_deref()).await?;
    let mut engine = EngineState::open(backend.store(), config)
        .await
        .context("Failed to load collection")?;
    let ctx = RunContext {
        json: cli.json,
        yes: cli.yes,
    };

    match cli.command {
        Commands::Import(args) => run_import(&mut engine, args, &ctx).await?,
        Commands::List(args) => run_list(&engine, args, &ctx).await?,
        Commands::Tags(args) => run_tags(&engine, args, &ctx)?,
        Commands::Show(args) => run_show(&engine, args, &ctx).await?,
        Commands::Stats => run_stats(&engine, &ctx).await?,
        Commands::SetCaption(args) => run_set_caption(&mut engine, args, &ctx).await?,
        Commands::DeleteTag(args) => {
            let operation = Operation::DeleteTag { tag: args.tag };
            run_bulk(&mut engine, operation, &args.bulk, &ctx).await?
        }
        Commands::RenameTag(args) => {
            let operation = Operation::RenameTag {
                old: args.old,
                new: args.new,
            };
            run_bulk(&mut engine, operation, &args.bulk, &ctx).await?
        }
        Commands::Replace(args) => {
            let operation = Operation::SearchReplace {
                pattern: args.pattern_flags.spec(args.pattern),
                replacement: args.replacement,
            };
            run_bulk(&mut engine, operation, &args.bulk, &ctx).await?
        }
        Commands::Insert(args) => {
            let operation = Operation::InsertAtMatch {
                target: args.pattern_flags.spec(args.target),
                text: args.text,
                position: args.position.into(),
                only_if_absent: args.if_absent,
            };
            run_bulk(&mut engine, operation, &args.bulk, &ctx).await?
        }
        Commands::DeleteText(args) => {
            let operation = Operation::DeleteText {
                target: args.pattern_flags.spec(args.target),
            };
            run_bulk(&mut engine, operation, &args.bulk, &ctx).await?
        }
        Commands::Append(args) => {
            let operation = Operation::AppendCaption { text: args.text };
            run_bulk(&mut engine, operation, &args.bulk, &ctx).await?
        }
        Commands::Matches(args) => run_matches(&mut engine, args, &ctx).await?,
        Commands::Remove(args) => run_remove(&mut engine, args, &ctx).await?,
        Commands::Clear => run_clear(&mut engine, &ctx).await?,
        Commands::Export(args) => run_export(&engine, &backend, args, &ctx).await?,
    }

    Ok(())
}

async fn run_import(engine: &mut EngineState, args: ImportArgs, ctx: &RunContext) -> Result<()> {
    let options = ScanOptions {
        recursive: args.recursive,
    };
    let dir = args.dir;
    let batch = tokio::task::spawn_blocking(move || import_directory(&dir, options))
        .await
        .context("Import task failed")??;

    let existing: HashSet<ItemId> = engine
        .items()
        .await?
        .into_iter()
        .map(|item| item.id)
        .collect();
    let fresh: Vec<Item> = batch
        .items
        .iter()
        .filter(|item| !existing.contains(&item.id))
        .cloned()
        .collect();
    let already_present = batch.items.len() - fresh.len();

    let added = if fresh.is_empty() {
        0
    } else {
        engine.add_items(fresh).await?
    };

    if ctx.json {
        print_json(&json!({
            "added": added,
            "already_present": already_present,
            "captioned": batch.captioned,
            "orphan_captions": batch.orphan_captions,
            "skipped": batch.skipped,
        }))?;
    } else {
        print_stdout(&output::import(&batch, added, already_present))?;
    }
    Ok(())
}

async fn run_list(engine: &EngineState, args: ListArgs, ctx: &RunContext) -> Result<()> {
    let items: Vec<Item> = engine
        .items()
        .await?
        .into_iter()
        .filter(|item| !args.uncaptioned || !item.is_captioned())
        .collect();

    if ctx.json {
        return print_json(&items);
    }
    if items.is_empty() {
        return print_stdout("No items.");
    }
    for item in &items {
        print_stdout(&output::item_line(item))?;
    }
    Ok(())
}

fn run_tags(engine: &EngineState, args: TagsArgs, ctx: &RunContext) -> Result<()> {
    let mut tags = engine.ranked_tags();
    if let Some(limit) = args.limit {
        tags.truncate(limit);
    }
    if ctx.json {
        return print_json(&tags);
    }
    print_stdout(&output::tag_table(&tags))
}

async fn find_item(engine: &EngineState, id: &ItemId) -> Result<Item> {
    engine
        .items()
        .await?
        .into_iter()
        .find(|item| &item.id == id)
        .with_context(|| format!("Item not found: {id}"))
}

async fn run_show(engine: &EngineState, args: ItemArgs, ctx: &RunContext) -> Result<()> {
    let item = find_item(engine, &ItemId::new(args.id)).await?;
    let tags = engine.tag_index().tags_for_item(&item.caption);
    if ctx.json {
        return print_json(&json!({ "item": item, "tags": tags }));
    }
    print_stdout(&output::item_detail(&item, &tags))
}

async fn run_stats(engine: &EngineState, ctx: &RunContext) -> Result<()> {
    let progress = engine.progress().await?;
    let tags = engine.tag_index().len();
    if ctx.json {
        return print_json(&json!({ "progress": progress, "tags": tags }));
    }
    print_stdout(&output::progress(&progress, tags))
}

async fn run_set_caption(
    engine: &mut EngineState,
    args: SetCaptionArgs,
    ctx: &RunContext,
) -> Result<()> {
    let id = ItemId::new(args.id);
    engine
        .update_caption(&id, &args.caption)
        .await
        .with_context(|| format!("Failed to update caption of {id}"))?;
    if ctx.json {
        return print_json(&json!({ "id": id, "caption": args.caption }));
    }
    print_stdout(&format!("Updated caption of {id}."))
}

async fn run_bulk(
    engine: &mut EngineState,
    operation: Operation,
    flags: &BulkFlags,
    ctx: &RunContext,
) -> Result<()> {
    let dry = engine.dry_run(&operation).await?;
    if flags.dry_run {
        if ctx.json {
            return print_json(&dry);
        }
        return print_stdout(&output::dry_run(&dry));
    }

    if dry.would_modify > 0 {
        let prompt = format!(
            "{} will change {} of {} matching caption(s). Continue?",
            dry.operation, dry.would_modify, dry.eligible
        );
        if !confirm::confirm(&prompt, ctx.yes)? {
            return print_stdout("Operation cancelled");
        }
    }

    let report = engine.apply(operation).await?;
    if ctx.json {
        print_json(&report)?;
    } else {
        print_stdout(&output::report(&report))?;
    }

    match report.outcome() {
        BulkOutcome::Partial | BulkOutcome::Failed => {
            bail!("{} caption write(s) failed", report.failures.len())
        }
        _ => Ok(()),
    }
}

async fn run_matches(engine: &mut EngineState, args: MatchesArgs, ctx: &RunContext) -> Result<()> {
    let Some(first) = engine.select_tag(&args.tag).await? else {
        if ctx.json {
            return print_json(&json!({ "tag": args.tag, "matches": [] }));
        }
        return print_stdout(&format!("No items are tagged '{}'.", args.tag));
    };

    let mut positions = vec![first];
    match args.at {
        Some(at) if at > 1 => {
            for _ in 1..at {
                if let Some(position) = engine.next_match() {
                    positions = vec![position];
                }
            }
        }
        Some(_) => {}
        None => {
            for _ in 1..positions[0].total {
                positions.extend(engine.next_match());
            }
        }
    }

    if ctx.json {
        return print_json(&json!({ "tag": args.tag, "matches": positions }));
    }
    let items = engine.items().await?;
    for position in &positions {
        if let Some(item) = items.iter().find(|item| item.id == position.id) {
            print_stdout(&output::match_line(position, item, &args.tag))?;
        }
    }
    Ok(())
}

async fn run_remove(engine: &mut EngineState, args: ItemArgs, ctx: &RunContext) -> Result<()> {
    let id = ItemId::new(args.id);
    let item = find_item(engine, &id).await?;
    if !confirm::confirm(&format!("Remove {} ({})?", item.name, id), ctx.yes)? {
        return print_stdout("Operation cancelled");
    }

    let removed = engine.remove_item(&id).await?;
    if ctx.json {
        return print_json(&json!({ "id": id, "removed": removed }));
    }
    print_stdout(&format!("Removed {}.", item.name))
}

async fn run_clear(engine: &mut EngineState, ctx: &RunContext) -> Result<()> {
    let total = engine.items().await?.len();
    if total > 0 && !confirm::confirm(&format!("Remove all {total} item(s)?"), ctx.yes)? {
        return print_stdout("Operation cancelled");
    }

    let cleared = engine.clear_all().await?;
    if ctx.json {
        return print_json(&json!({ "cleared": cleared }));
    }
    print_stdout(&format!("Removed {cleared} item(s)."))
}

async fn run_export(
    engine: &EngineState,
    backend: &Backend,
    args: ExportArgs,
    ctx: &RunContext,
) -> Result<()> {
    let items = engine.items().await?;
    let plan = plan_export(&items)?;
    let out = args.out;
    let mut summary = {
        let out = out.clone();
        tokio::task::spawn_blocking(move || write_plan(&plan, &out))
            .await
            .context("Export task failed")??
    };

    if let Some(remote) = backend.remote() {
        fetch_missing_media(remote, &items, &out, &mut summary).await?;
    }

    if ctx.json {
        return print_json(&summary);
    }
    print_stdout(&output::export(&summary))
}

/// Download images a remote collection holds only on the server
async fn fetch_missing_media(
    remote: &caption_store::HttpStore,
    items: &[Item],
    out: &Path,
    summary: &mut ExportSummary,
) -> Result<()> {
    let mut still_missing = Vec::new();
    for id in std::mem::take(&mut summary.missing_media) {
        let Some(item) = items.iter().find(|item| item.id == id) else {
            continue;
        };
        match remote.fetch_image(&id).await {
            Ok(bytes) => match write_export_file(out, &item.name, &bytes) {
                Ok(_) => summary.images_written += 1,
                Err(err) => {
                    log::warn!("{err}");
                    summary.rejected_names.push(item.name.clone());
                }
            },
            Err(err) => {
                log::warn!("Failed to download {}: {err}", item.name);
                still_missing.push(id);
            }
        }
    }
    summary.missing_media = still_missing;
    Ok(())
}
