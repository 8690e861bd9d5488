//! Generic archive-tree walker
//!
//! Depth-first traversal driven by an ordered list of [`LevelKind`]s. At each
//! directory the walker asks the grammar to parse the segment for the current
//! level; on success every registered [`Visitor`] is notified and the walk
//! descends, on failure the subtree is skipped with a diagnostic and the walk
//! continues at the parent level. Clip files are parsed at the leaf, relative
//! times resolved through the [`TimeResolver`], and the resulting descriptors
//! handed to visitors.
//!
//! Sibling names are sorted lexically before recursion so walks are
//! deterministic regardless of filesystem enumeration order.

use crate::grammar::NameGrammar;
use crate::grammar::ParseContext;
use crate::resolve::TimeResolver;
use crate::types::{ClipDescriptor, ClipTime, LevelKind};
use nocturn_common::time::utc_from_naive;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Fatal walk failure. Everything below the root is recoverable and handled
/// with diagnostics and counters instead.
#[derive(Debug, Error)]
pub enum WalkError {
    /// Root path does not exist
    #[error("root path not found: {0}")]
    RootNotFound(PathBuf),

    /// Root path exists but is not a directory
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Root directory name is not valid UTF-8
    #[error("unusable root directory name: {0}")]
    BadRootName(PathBuf),

    /// Misconfigured level sequence
    #[error("bad level sequence: {0}")]
    BadLevels(String),
}

/// Running accepted/ignored totals, readable at any point of the walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalkCounters {
    /// Clip files parsed, resolved, and handed to visitors
    pub accepted: u64,
    /// Clip files rejected, plus clip files under skipped subtrees
    pub ignored: u64,
}

/// Per-level callbacks, invoked in registration order. All methods default to
/// no-ops so a visitor implements only the levels it cares about.
pub trait Visitor {
    fn start_visits(&mut self) {}
    fn visit_year(&mut self, _ctx: &ParseContext, _path: &Path) {}
    fn visit_station(&mut self, _ctx: &ParseContext, _path: &Path) {}
    fn visit_month(&mut self, _ctx: &ParseContext, _path: &Path) {}
    fn visit_day(&mut self, _ctx: &ParseContext, _path: &Path) {}
    fn visit_clip_class(&mut self, _ctx: &ParseContext, _path: &Path) {}
    fn visit_clip(&mut self, _clip: &ClipDescriptor) {}
    fn end_visits(&mut self) {}
}

/// Default level sequence for the historical archive layouts.
pub const DEFAULT_LEVELS: [LevelKind; 6] = [
    LevelKind::Year,
    LevelKind::Station,
    LevelKind::Month,
    LevelKind::Day,
    LevelKind::ClipClass,
    LevelKind::Clip,
];

/// Archive tree walker
pub struct ArchiveWalker<'a> {
    grammar: NameGrammar,
    resolver: TimeResolver,
    levels: Vec<LevelKind>,
    visitors: Vec<&'a mut dyn Visitor>,
    suppress: Vec<String>,
    counters: WalkCounters,
}

impl<'a> ArchiveWalker<'a> {
    /// Walker over the default level sequence.
    pub fn new(grammar: NameGrammar, resolver: TimeResolver) -> Self {
        Self {
            grammar,
            resolver,
            levels: DEFAULT_LEVELS.to_vec(),
            visitors: Vec::new(),
            suppress: Vec::new(),
            counters: WalkCounters::default(),
        }
    }

    /// Walker over a custom level sequence. The last level must be the clip
    /// leaf and the second-to-last the (self-recursive) classification level.
    pub fn with_levels(
        grammar: NameGrammar,
        resolver: TimeResolver,
        levels: Vec<LevelKind>,
    ) -> Result<Self, WalkError> {
        if levels.len() < 3 {
            return Err(WalkError::BadLevels(
                "need at least one directory level plus classification and clip".to_string(),
            ));
        }
        if levels[levels.len() - 1] != LevelKind::Clip {
            return Err(WalkError::BadLevels("last level must be clip".to_string()));
        }
        if levels[levels.len() - 2] != LevelKind::ClipClass {
            return Err(WalkError::BadLevels(
                "second-to-last level must be classification".to_string(),
            ));
        }
        let mut walker = Self::new(grammar, resolver);
        walker.levels = levels;
        Ok(walker)
    }

    /// Diagnostic suppression substrings; suppressed messages still count.
    pub fn with_suppress(mut self, suppress: Vec<String>) -> Self {
        self.suppress = suppress;
        self
    }

    /// Register a visitor. Visitors are invoked in registration order.
    pub fn register(&mut self, visitor: &'a mut dyn Visitor) {
        self.visitors.push(visitor);
    }

    /// Running totals.
    pub fn counters(&self) -> WalkCounters {
        self.counters
    }

    /// Walk the tree rooted at `root`. The final path component is the
    /// first-level directory name.
    pub fn walk(&mut self, root: &Path) -> Result<WalkCounters, WalkError> {
        if !root.exists() {
            return Err(WalkError::RootNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(WalkError::NotADirectory(root.to_path_buf()));
        }
        let name = root
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| WalkError::BadRootName(root.to_path_buf()))?;

        for visitor in self.visitors.iter_mut() {
            visitor.start_visits();
        }
        self.walk_level(0, &name, root, &ParseContext::default());
        for visitor in self.visitors.iter_mut() {
            visitor.end_visits();
        }

        debug!(
            accepted = self.counters.accepted,
            ignored = self.counters.ignored,
            "walk complete"
        );
        Ok(self.counters)
    }

    fn walk_level(&mut self, level_idx: usize, name: &str, path: &Path, ctx: &ParseContext) {
        let level = self.levels[level_idx];
        let ctx = match self.grammar.parse(level, name, ctx) {
            Ok(ctx) => ctx,
            Err(e) => {
                let mut message = format!("{} at {}", e, path.display());
                if level.is_countable() {
                    let clips = count_clip_files(path);
                    self.counters.ignored += clips;
                    message.push_str(&format!(" ({} clip files ignored)", clips));
                }
                self.diagnostic(&message);
                return;
            }
        };
        self.notify(level, &ctx, path);

        let class_idx = self.levels.len() - 2;
        let next_idx = if level_idx == class_idx {
            level_idx
        } else {
            level_idx + 1
        };
        // Clip files appear alongside (or instead of) classification
        // subdirectories once the walk is at or past the day level.
        let clips_here = level_idx + 1 >= class_idx;

        let (dirs, files) = match sorted_entries(path) {
            Ok(listing) => listing,
            Err(e) => {
                self.diagnostic(&format!("cannot list {}: {}", path.display(), e));
                return;
            }
        };

        for (dir_name, dir_path) in dirs {
            self.walk_level(next_idx, &dir_name, &dir_path, &ctx);
        }
        for (file_name, file_path) in files {
            if clips_here {
                self.process_clip(&file_name, &file_path, &ctx);
            } else {
                debug!(
                    "skipping file {} above the day level",
                    file_path.display()
                );
            }
        }
    }

    fn process_clip(&mut self, name: &str, path: &Path, ctx: &ParseContext) {
        let ctx = match self.grammar.parse(LevelKind::Clip, name, ctx) {
            Ok(ctx) => ctx,
            Err(e) => {
                self.ignore(&format!("{} at {}", e, path.display()));
                return;
            }
        };

        let (station, detector) = match (&ctx.station, &ctx.detector) {
            (Some(station), Some(detector)) => (station.clone(), detector.clone()),
            _ => {
                self.ignore(&format!("no station for clip {}", path.display()));
                return;
            }
        };

        let time = match ctx.clip_time {
            // Ambiguity checks only apply when a DST table is configured.
            Some(ClipTime::Absolute(local)) if !self.resolver.has_dst_table() => local,
            Some(ClipTime::Absolute(local)) => {
                match self.resolver.is_time_ambiguous(local, &station) {
                    Ok(false) => local,
                    Ok(true) => {
                        self.ignore(&format!(
                            "ambiguous local time {} at {}",
                            local,
                            path.display()
                        ));
                        return;
                    }
                    Err(e) => {
                        self.ignore(&format!("{} at {}", e, path.display()));
                        return;
                    }
                }
            }
            Some(ClipTime::Relative(elapsed)) => {
                let date = match ctx.date() {
                    Some(date) => date,
                    None => {
                        self.ignore(&format!(
                            "no date in context for relative clip {}",
                            path.display()
                        ));
                        return;
                    }
                };
                match self.resolver.resolve_elapsed_time(&station, date, elapsed) {
                    Some(time) => time,
                    None => {
                        self.ignore(&format!(
                            "no monitoring start time for station {} on {} ({})",
                            station,
                            date,
                            path.display()
                        ));
                        return;
                    }
                }
            }
            None => {
                self.ignore(&format!("no clip time for {}", path.display()));
                return;
            }
        };

        let descriptor = ClipDescriptor {
            station,
            detector,
            time: utc_from_naive(time),
            clip_class: ctx.clip_class.clone(),
            path: path.to_path_buf(),
        };
        for visitor in self.visitors.iter_mut() {
            visitor.visit_clip(&descriptor);
        }
        self.counters.accepted += 1;
    }

    fn notify(&mut self, level: LevelKind, ctx: &ParseContext, path: &Path) {
        for visitor in self.visitors.iter_mut() {
            match level {
                LevelKind::Year => visitor.visit_year(ctx, path),
                LevelKind::Station => visitor.visit_station(ctx, path),
                LevelKind::Month => visitor.visit_month(ctx, path),
                LevelKind::Day => visitor.visit_day(ctx, path),
                LevelKind::ClipClass => visitor.visit_clip_class(ctx, path),
                LevelKind::Clip => {}
            }
        }
    }

    fn ignore(&mut self, message: &str) {
        self.counters.ignored += 1;
        self.diagnostic(message);
    }

    fn diagnostic(&self, message: &str) {
        if !self.suppress.iter().any(|s| message.contains(s.as_str())) {
            warn!("{}", message);
        }
    }
}

/// List a directory's children, split into directories and files, each sorted
/// lexically by name. Entries with non-UTF-8 names are skipped with a
/// diagnostic-free debug line.
fn sorted_entries(path: &Path) -> std::io::Result<(Vec<(String, PathBuf)>, Vec<(String, PathBuf)>)> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => {
                debug!("skipping non-UTF-8 name under {}", path.display());
                continue;
            }
        };
        if entry.file_type()?.is_dir() {
            dirs.push((name, entry_path));
        } else {
            files.push((name, entry_path));
        }
    }
    dirs.sort();
    files.sort();
    Ok((dirs, files))
}

/// Count the clip files under a subtree that is about to be skipped, so the
/// report shows the blast radius of one bad directory name.
fn count_clip_files(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .map(crate::grammar::matches_clip_grammar)
                    .unwrap_or(false)
        })
        .count() as u64
}
