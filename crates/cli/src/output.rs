use anyhow::Result;
use caption_dataset::{ExportSummary, ImportBatch};
use caption_engine::{
    format_file_size, highlight_range, BulkOutcome, BulkReport, DryRun, Item, MatchPosition,
    Progress, TagCount,
};
use console::style;
use serde::Serialize;
use std::io;

pub(crate) fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    print_stdout(&serde_json::to_string_pretty(value)?)
}

fn caption_or_placeholder(caption: &str) -> String {
    if caption.trim().is_empty() {
        style("(no caption)").dim().to_string()
    } else {
        caption.to_string()
    }
}

pub(crate) fn item_line(item: &Item) -> String {
    format!(
        "{}  {}  {}  {}",
        style(item.id.as_str()).yellow(),
        style(&item.name).bold(),
        style(format_file_size(item.media.size_bytes)).dim(),
        caption_or_placeholder(&item.caption)
    )
}

pub(crate) fn item_detail(item: &Item, tags: &[TagCount]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", style("ID:").bold(), style(item.id.as_str()).yellow()));
    out.push_str(&format!("{} {}\n", style("Name:").bold(), item.name));
    if let Some(content_type) = &item.media.content_type {
        out.push_str(&format!("{} {}\n", style("Type:").bold(), content_type));
    }
    out.push_str(&format!(
        "{} {}\n",
        style("Size:").bold(),
        format_file_size(item.media.size_bytes)
    ));
    if let Some(source) = &item.media.source {
        out.push_str(&format!("{} {}\n", style("Source:").bold(), style(source.display()).dim()));
    }
    out.push_str(&format!(
        "{} {}\n",
        style("Caption:").bold(),
        caption_or_placeholder(&item.caption)
    ));
    out.push_str(&format!("{}", style("Tags:").bold()));
    if tags.is_empty() {
        out.push_str(" none");
    }
    for tag in tags {
        out.push_str(&format!("\n  {} {}", tag.tag, style(format!("({})", tag.count)).dim()));
    }
    out
}

pub(crate) fn tag_table(tags: &[TagCount]) -> String {
    if tags.is_empty() {
        return "No tags yet.".to_string();
    }
    let width = tags
        .iter()
        .map(|tag| tag.count.to_string().len())
        .max()
        .unwrap_or(1);
    tags.iter()
        .map(|tag| format!("{:>width$}  {}", style(tag.count).cyan(), tag.tag))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn progress(progress: &Progress, tags: usize) -> String {
    format!(
        "{} {}\n{} {} ({:.1}%)\n{} {}",
        style("Items:").bold(),
        progress.total,
        style("Captioned:").bold(),
        progress.captioned,
        progress.percent,
        style("Tags:").bold(),
        tags
    )
}

/// Caption with the first occurrence of `tag` emphasised
pub(crate) fn highlighted(caption: &str, tag: &str) -> String {
    match highlight_range(caption, tag) {
        Some(range) => format!(
            "{}{}{}",
            &caption[..range.start],
            style(&caption[range.clone()]).yellow().bold(),
            &caption[range.end..]
        ),
        None => caption.to_string(),
    }
}

pub(crate) fn match_line(position: &MatchPosition, item: &Item, tag: &str) -> String {
    format!(
        "[{}/{}] {}  {}  {}",
        position.ordinal,
        position.total,
        style(position.id.as_str()).yellow(),
        style(&item.name).bold(),
        highlighted(&item.caption, tag)
    )
}

pub(crate) fn dry_run(dry: &DryRun) -> String {
    format!(
        "{}: {} matching caption(s), {} would change ({} occurrence(s))",
        dry.operation, dry.eligible, dry.would_modify, dry.occurrences
    )
}

pub(crate) fn report(report: &BulkReport) -> String {
    let summary = match report.outcome() {
        BulkOutcome::Applied => style(report.summary()).green().to_string(),
        BulkOutcome::Partial | BulkOutcome::Failed => style(report.summary()).red().to_string(),
        BulkOutcome::NothingFound | BulkOutcome::Unchanged => report.summary(),
    };
    let mut out = summary;
    for failure in &report.failures {
        out.push_str(&format!(
            "\n  {} {}: {}",
            style("failed").red(),
            failure.id,
            failure.error
        ));
    }
    out
}

pub(crate) fn import(batch: &ImportBatch, added: usize, already_present: usize) -> String {
    let mut out = format!(
        "Imported {} image(s), {} with captions.",
        added, batch.captioned
    );
    if already_present > 0 {
        out.push_str(&format!("\nSkipped {already_present} already in the collection."));
    }
    if !batch.orphan_captions.is_empty() {
        out.push_str(&format!(
            "\nCaption files without an image: {}",
            batch.orphan_captions.join(", ")
        ));
    }
    if !batch.skipped.is_empty() {
        out.push_str(&format!("\nIgnored: {}", batch.skipped.join(", ")));
    }
    out
}

pub(crate) fn export(summary: &ExportSummary) -> String {
    let mut out = format!(
        "Exported {} image(s) and {} caption file(s).",
        summary.images_written, summary.captions_written
    );
    if !summary.missing_media.is_empty() {
        let ids: Vec<&str> = summary.missing_media.iter().map(|id| id.as_str()).collect();
        out.push_str(&format!(
            "\n{} {}",
            style("Image data unavailable for:").yellow(),
            ids.join(", ")
        ));
    }
    if !summary.rejected_names.is_empty() {
        out.push_str(&format!(
            "\n{} {}",
            style("Unsafe file names skipped:").yellow(),
            summary.rejected_names.join(", ")
        ));
    }
    out
}
