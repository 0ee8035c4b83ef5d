//! File collector: resolves a path group's root, walks it and emits candidate paths.

use crossbeam_channel::Sender;
use log::{debug, error, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use walkdir::WalkDir;

use crate::engine::tools::{
    PathMatcher, expand_tilde, is_literal_pattern, repo_path_from_target, root_path_for_pattern,
};
use crate::error::ScanError;
use crate::pipeline::error_handler::FailureQueue;
use crate::{CandidatePath, PathGroup};

/// One result from a directory walk: a path to consider, or a walk error.
pub enum WalkOutcome {
    Ok { path: PathBuf, is_dir: bool },
    Err { msg: String, path: Option<PathBuf> },
}

/// Convert a walkdir result into [`WalkOutcome`].
pub fn to_outcome_walkdir(r: Result<walkdir::DirEntry, walkdir::Error>) -> WalkOutcome {
    match r {
        Ok(entry) => {
            let is_dir = entry.file_type().is_dir();
            WalkOutcome::Ok {
                path: entry.into_path(),
                is_dir,
            }
        }
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

/// Walk `root` without following symlinks. A per-entry error goes to `on_error` and the
/// walk continues with the next entry.
fn walk_paths<E>(root: &Path, recursive: bool, on_error: &mut E) -> Vec<(PathBuf, bool)>
where
    E: FnMut(ScanError),
{
    let mut walker = WalkDir::new(root).min_depth(1);
    if !recursive {
        walker = walker.max_depth(1);
    }
    let mut paths = Vec::new();
    for outcome in walker.into_iter().map(to_outcome_walkdir) {
        match outcome {
            WalkOutcome::Ok { path, is_dir } => paths.push((path, is_dir)),
            WalkOutcome::Err { msg, path } => {
                let reason = match path {
                    Some(p) => format!("{} ({})", msg, p.display()),
                    None => msg,
                };
                on_error(ScanError::Walk {
                    root: root.to_path_buf(),
                    reason,
                });
            }
        }
    }
    paths
}

/// Collect the files of `group`, calling `on_path` for each one in walk order.
///
/// A root that is a single file is emitted as is, without applying the pattern or exclusions.
/// For a directory root the whole tree (or one level when not recursive) is walked first, then
/// directories are skipped and every path matching the pattern and no exclusion is emitted.
/// Symlinks are not followed; they are candidates like any other leaf.
/// `on_path` returns false to stop early (queue closed or cancelled). Unreadable entries are
/// passed to `on_error` and skipped. Returns the number of paths emitted.
pub fn collect_files_for_indexing<F, E>(
    group: &PathGroup,
    mut on_path: F,
    mut on_error: E,
) -> Result<usize, ScanError>
where
    F: FnMut(PathBuf) -> bool,
    E: FnMut(ScanError),
{
    let mut pattern = expand_tilde(&group.pattern);
    let root = root_path_for_pattern(&pattern, group.regexp);
    let meta = std::fs::metadata(&root).map_err(|source| ScanError::RootPath {
        pattern: group.pattern.clone(),
        root: root.clone(),
        source,
    })?;

    if !meta.is_dir() {
        return Ok(usize::from(on_path(root)));
    }

    if !group.regexp {
        if pattern.ends_with('/') {
            pattern.push('*');
        } else if is_literal_pattern(&pattern, false) {
            // A plain directory path means everything under it.
            pattern.push_str("/*");
        }
    }
    let matcher = PathMatcher::new(&pattern, group.regexp, &group.exclusions)?;
    // Walking "." yields "./x"; a pattern without that prefix matches "x".
    let strip_dot = root == Path::new(".") && !pattern.starts_with("./");

    let mut count = 0_usize;
    for (path, is_dir) in walk_paths(&root, group.recursive, &mut on_error) {
        // Only files are indexing candidates.
        if is_dir {
            continue;
        }
        let match_path = match path.strip_prefix(".") {
            Ok(rel) if strip_dot => rel,
            _ => path.as_path(),
        };
        if !matcher.is_match(match_path) {
            continue;
        }
        if !on_path(path) {
            break;
        }
        count += 1;
    }
    Ok(count)
}

fn is_cancelled(cancel: &Option<Arc<AtomicBool>>) -> bool {
    cancel.as_ref().is_some_and(|c| c.load(Ordering::Relaxed))
}

/// Drive the collector over every group in order, sending each path to the indexing stage.
///
/// A group that fails (bad root, bad pattern) is logged and recorded on `errors` and the loop
/// moves on to the next group. Unreadable entries inside a group are recorded the same way. Drops `path_tx` when done so indexing workers can exit.
/// Returns the number of paths enqueued.
pub fn run_collect_loop(
    groups: &[PathGroup],
    path_tx: Sender<CandidatePath>,
    errors: &FailureQueue,
    cancel: &Option<Arc<AtomicBool>>,
) -> usize {
    let mut count = 0_usize;
    for group in groups {
        if is_cancelled(cancel) {
            break;
        }
        let repo_path = repo_path_from_target(&group.target);
        let mut closed = false;
        let result = collect_files_for_indexing(
            group,
            |path| {
                if is_cancelled(cancel) {
                    return false;
                }
                let candidate = CandidatePath {
                    path,
                    repo_path: repo_path.clone(),
                };
                if path_tx.send(candidate).is_err() {
                    closed = true;
                    return false;
                }
                true
            },
            |e| {
                warn!("{}", e);
                errors.add(e);
            },
        );
        match result {
            Ok(n) => {
                debug!("Pattern {} matched {} file(s)", group.pattern, n);
                count += n;
            }
            Err(e) => {
                error!("{}", e);
                errors.add(e);
            }
        }
        if closed {
            errors.add(ScanError::QueueClosed("indexing"));
            break;
        }
    }
    drop(path_tx);
    count
}

pub fn spawn_collect_thread(
    groups: Vec<PathGroup>,
    path_tx: Sender<CandidatePath>,
    errors: FailureQueue,
    cancel: Option<Arc<AtomicBool>>,
) -> JoinHandle<usize> {
    thread::spawn(move || run_collect_loop(&groups, path_tx, &errors, &cancel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("libs/nested")).unwrap();
        fs::create_dir_all(root.join("libs/skip.jar")).unwrap();
        fs::write(root.join("libs/a.jar"), b"a").unwrap();
        fs::write(root.join("libs/b.war"), b"b").unwrap();
        fs::write(root.join("libs/nested/c.jar"), b"c").unwrap();
        fs::write(root.join("libs/nested/c-sources.jar"), b"c").unwrap();
        dir
    }

    fn collect(group: &PathGroup) -> Vec<PathBuf> {
        let mut out = Vec::new();
        collect_files_for_indexing(
            group,
            |p| {
                out.push(p);
                true
            },
            |e| panic!("unexpected walk error: {e}"),
        )
        .unwrap();
        out.sort();
        out
    }

    #[test]
    fn test_single_file_root_ignores_exclusions() {
        let dir = tree();
        let file = dir.path().join("libs/a.jar");
        let group = PathGroup::new(file.to_string_lossy().to_string())
            .with_exclusions(vec!["*.jar".to_string()]);
        assert_eq!(collect(&group), vec![file]);
    }

    #[test]
    fn test_recursive_wildcard_skips_dirs() {
        let dir = tree();
        let root = dir.path().join("libs");
        let group = PathGroup::new(format!("{}/*.jar", root.display()));
        assert_eq!(
            collect(&group),
            vec![
                root.join("a.jar"),
                root.join("nested/c-sources.jar"),
                root.join("nested/c.jar"),
            ]
        );
    }

    #[test]
    fn test_non_recursive_stays_at_top() {
        let dir = tree();
        let root = dir.path().join("libs");
        let group = PathGroup::new(format!("{}/*.jar", root.display())).with_recursive(false);
        assert_eq!(collect(&group), vec![root.join("a.jar")]);
    }

    #[test]
    fn test_exclusions_filter_matches() {
        let dir = tree();
        let root = dir.path().join("libs");
        let group = PathGroup::new(format!("{}/", root.display()))
            .with_exclusions(vec!["*-sources.jar".to_string(), "*.war".to_string()]);
        assert_eq!(
            collect(&group),
            vec![root.join("a.jar"), root.join("nested/c.jar")]
        );
    }

    #[test]
    fn test_missing_root_is_group_error() {
        let dir = tree();
        let group = PathGroup::new(format!("{}/missing/*.jar", dir.path().display()));
        let err = collect_files_for_indexing(&group, |_| true, |_| {}).unwrap_err();
        assert!(matches!(err, ScanError::RootPath { .. }));
    }

    #[test]
    fn test_collect_loop_continues_after_bad_group() {
        let dir = tree();
        let groups = vec![
            PathGroup::new(format!("{}/missing/*", dir.path().display())),
            PathGroup::new(format!("{}/libs/*.war", dir.path().display()))
                .with_target("repo/war/app.war"),
        ];
        let (tx, rx) = crossbeam_channel::bounded(16);
        let errors = FailureQueue::new(crate::Stage::Indexing, 10);
        let n = run_collect_loop(&groups, tx, &errors, &None);
        assert_eq!(n, 1);
        let got: Vec<CandidatePath> = rx.iter().collect();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].repo_path, "repo/war/");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_collect_loop_honours_cancel() {
        let dir = tree();
        let groups = vec![PathGroup::new(format!("{}/libs/*", dir.path().display()))];
        let (tx, rx) = crossbeam_channel::bounded(16);
        let errors = FailureQueue::new(crate::Stage::Indexing, 10);
        let cancel = Some(Arc::new(AtomicBool::new(true)));
        assert_eq!(run_collect_loop(&groups, tx, &errors, &cancel), 0);
        assert_eq!(rx.iter().count(), 0);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_on_path_false_stops() {
        let dir = tree();
        let group = PathGroup::new(format!("{}/libs/*", dir.path().display()));
        let n = collect_files_for_indexing(&group, |_| false, |_| {}).unwrap();
        assert_eq!(n, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_does_not_drop_group() {
        let dir = tempfile::tempdir().unwrap();
        let libs = dir.path().join("libs");
        fs::create_dir_all(&libs).unwrap();
        fs::write(libs.join("a.jar"), b"a").unwrap();
        fs::write(libs.join("b.jar"), b"b").unwrap();
        std::os::unix::fs::symlink(libs.join("gone.txt"), libs.join("stale.lnk")).unwrap();
        let group = PathGroup::new(format!("{}/*.jar", libs.display()));
        assert_eq!(collect(&group), vec![libs.join("a.jar"), libs.join("b.jar")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_is_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let libs = dir.path().join("libs");
        fs::create_dir_all(libs.join("sub")).unwrap();
        fs::write(libs.join("a.jar"), b"a").unwrap();
        std::os::unix::fs::symlink(&libs, libs.join("sub/loop")).unwrap();
        let group = PathGroup::new(format!("{}/*.jar", libs.display()));
        assert_eq!(collect(&group), vec![libs.join("a.jar")]);
    }
}
