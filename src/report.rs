use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tempfile::NamedTempFile;
use tracing::info;

use crate::models::{BrandOutcome, BrandResult, Item};
use crate::utils::error::{AppError, Result};

const MAX_REPORTS_PER_DAY: u32 = 999;

/// Writes one markdown report per run into an archive directory.
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `content` as `YYYY-MM-DD.md`, or `YYYY-MM-DD-N.md` if earlier runs
    /// already claimed the date. Existing reports are never replaced.
    pub fn write(&self, date: NaiveDate, content: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| self.error(e))?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| self.error(e))?;
        tmp.write_all(content.as_bytes()).map_err(|e| self.error(e))?;
        tmp.as_file_mut().sync_all().map_err(|e| self.error(e))?;

        let stem = date.format("%Y-%m-%d").to_string();
        for n in 1..=MAX_REPORTS_PER_DAY {
            let name = if n == 1 {
                format!("{}.md", stem)
            } else {
                format!("{}-{}.md", stem, n)
            };
            let target = self.dir.join(name);
            match tmp.persist_noclobber(&target) {
                Ok(_) => {
                    info!("Wrote {}", target.display());
                    return Ok(target);
                }
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => tmp = e.file,
                Err(e) => return Err(self.error(e.error)),
            }
        }
        Err(AppError::Report(format!(
            "{} already holds {} reports for {}",
            self.dir.display(),
            MAX_REPORTS_PER_DAY,
            stem
        )))
    }

    fn error(&self, e: std::io::Error) -> AppError {
        AppError::Report(format!("{}: {}", self.dir.display(), e))
    }
}

/// Render the run report. Brands appear in registry order, items in extraction order.
pub fn render(date: NaiveDate, brands: &[BrandResult]) -> String {
    let mut md = String::new();
    md.push_str(&format!("# Brand Radar ~ {}\n\n", date.format("%Y-%m-%d")));

    let scanned = brands.iter().filter(|b| b.scan().is_some()).count();
    let skipped = brands.len() - scanned;
    let new_total: usize = brands
        .iter()
        .filter_map(BrandResult::scan)
        .map(|s| s.new_items.len())
        .sum();
    md.push_str(&format!(
        "{} new {} across {} scanned {}",
        new_total,
        plural(new_total, "item", "items"),
        scanned,
        plural(scanned, "brand", "brands"),
    ));
    if skipped > 0 {
        md.push_str(&format!(", {} skipped", skipped));
    }
    md.push_str(".\n");

    for result in brands {
        md.push('\n');
        match &result.outcome {
            BrandOutcome::Scanned(scan) => {
                if scan.seeding {
                    md.push_str(&format!("## {} (first scan)\n\n", result.brand));
                } else {
                    md.push_str(&format!("## {}\n\n", result.brand));
                }
                if scan.new_items.is_empty() {
                    md.push_str("_No new items._\n");
                } else {
                    for item in &scan.new_items {
                        md.push_str(&item_line(item));
                        md.push('\n');
                    }
                }
                if !scan.notes.is_empty() {
                    md.push_str(&format!("\n_Notes: {}_\n", scan.notes.join("; ")));
                }
            }
            BrandOutcome::Failed { error } => {
                md.push_str(&format!("## {}\n\n_Skipped: {}_\n", result.brand, error));
            }
        }
    }
    md
}

/// `- [name](link) · price`, dropping the parts that are missing.
pub fn item_line(item: &Item) -> String {
    let mut line = if item.link.is_empty() {
        format!("- {}", item.name)
    } else {
        format!("- [{}]({})", escape_brackets(&item.name), escape_link(&item.link))
    };
    if let Some(price) = &item.price {
        line.push_str(&format!(" · {}", price));
    }
    line
}

fn escape_brackets(s: &str) -> String {
    s.replace('[', "\\[").replace(']', "\\]")
}

/// Percent-encode the characters that would end a markdown link target early.
fn escape_link(link: &str) -> String {
    let mut out = String::with_capacity(link.len());
    for c in link.chars() {
        match c {
            ' ' => out.push_str("%20"),
            '(' => out.push_str("%28"),
            ')' => out.push_str("%29"),
            '<' => out.push_str("%3C"),
            '>' => out.push_str("%3E"),
            _ => out.push(c),
        }
    }
    out
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}
