use crate::error::{DatasetError, Result};
use crate::pairing::caption_file_name;
use caption_engine::{Item, ItemId};
use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportContent {
    /// Copy image bytes from a file on disk
    CopyFrom(PathBuf),
    /// Caption text written verbatim
    Caption(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    pub file_name: String,
    pub content: ExportContent,
}

/// Files an export would produce
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportPlan {
    pub entries: Vec<ExportEntry>,
    /// Items whose image bytes are not available locally
    pub missing_media: Vec<ItemId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub images_written: usize,
    pub captions_written: usize,
    pub missing_media: Vec<ItemId>,
    /// Names that would escape the export directory
    pub rejected_names: Vec<String>,
}

/// Plan the dataset layout: every image under its own name, plus
/// `<base>.txt` holding the caption when it is not blank.
pub fn plan_export(items: &[Item]) -> Result<ExportPlan> {
    if items.is_empty() {
        return Err(DatasetError::EmptyCollection);
    }

    let mut plan = ExportPlan::default();
    for item in items {
        match item.media.source.as_ref().filter(|source| source.is_file()) {
            Some(source) => plan.entries.push(ExportEntry {
                file_name: item.name.clone(),
                content: ExportContent::CopyFrom(source.clone()),
            }),
            None => plan.missing_media.push(item.id.clone()),
        }

        if item.is_captioned() {
            plan.entries.push(ExportEntry {
                file_name: caption_file_name(&item.name),
                content: ExportContent::Caption(item.caption.clone()),
            });
        }
    }
    Ok(plan)
}

/// Write a planned export into `out_dir`, creating it when needed
pub fn write_plan(plan: &ExportPlan, out_dir: &Path) -> Result<ExportSummary> {
    fs::create_dir_all(out_dir)?;
    let mut summary = ExportSummary {
        missing_media: plan.missing_media.clone(),
        ..ExportSummary::default()
    };

    for entry in &plan.entries {
        let target = match safe_join(out_dir, &entry.file_name) {
            Ok(target) => target,
            Err(e) => {
                log::warn!("{e}");
                summary.rejected_names.push(entry.file_name.clone());
                continue;
            }
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        match &entry.content {
            ExportContent::CopyFrom(source) => {
                fs::copy(source, &target)?;
                summary.images_written += 1;
            }
            ExportContent::Caption(text) => {
                fs::write(&target, text)?;
                summary.captions_written += 1;
            }
        }
        log::debug!("Wrote {}", target.display());
    }

    log::info!(
        "Exported {} images and {} captions to {}",
        summary.images_written,
        summary.captions_written,
        out_dir.display()
    );
    Ok(summary)
}

pub fn export_to_dir(items: &[Item], out_dir: &Path) -> Result<ExportSummary> {
    write_plan(&plan_export(items)?, out_dir)
}

/// Write raw bytes under `out_dir`, for images fetched from elsewhere
pub fn write_export_file(out_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let target = safe_join(out_dir, file_name)?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, bytes)?;
    Ok(target)
}

fn safe_join(out_dir: &Path, file_name: &str) -> Result<PathBuf> {
    let rel = Path::new(file_name);
    let mut has_component = false;
    for component in rel.components() {
        match component {
            Component::Normal(_) => has_component = true,
            Component::CurDir => {}
            Component::Prefix(_) | Component::RootDir | Component::ParentDir => {
                return Err(DatasetError::UnsafeName(file_name.to_string()));
            }
        }
    }
    if !has_component {
        return Err(DatasetError::UnsafeName(file_name.to_string()));
    }
    Ok(out_dir.join(rel))
}
