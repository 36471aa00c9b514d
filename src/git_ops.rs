use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
    process::Command,
};

use crate::diff::{BlameOrigin, BlameTarget, ChangeKind, DiffKey};
use crate::model::{Commit, RefKind, Reference};

const RECORD_SEP: char = '\x1e';
const FIELD_SEP: char = '\x1f';

fn run_git(cwd: &Path, args: &[&str]) -> io::Result<std::process::Output> {
    tracing::debug!(target: "histview::git", "git {}", args.join(" "));
    Command::new("git")
        .arg("-C")
        .arg(cwd)
        .args(["-c", "core.quotePath=false", "-c", "color.ui=never"])
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("GCM_INTERACTIVE", "never")
        .env("GIT_PAGER", "cat")
        .env("PAGER", "cat")
        .env("GIT_EDITOR", ":")
        .env("EDITOR", ":")
        .env("GIT_SEQUENCE_EDITOR", ":")
        .env("GIT_MERGE_AUTOEDIT", "no")
        .output()
}

/// Run git and return stdout, or git's trimmed stderr on failure.
fn git_stdout(cwd: &Path, args: &[&str]) -> Result<String, String> {
    let out = run_git(cwd, args).map_err(|e| e.to_string())?;
    if !out.status.success() {
        let err = String::from_utf8_lossy(&out.stderr).trim().to_string();
        tracing::warn!(target: "histview::git", "git {} failed: {}", args.first().unwrap_or(&""), err);
        return Err(err);
    }
    Ok(String::from_utf8_lossy(&out.stdout).to_string())
}

fn git_unit(cwd: &Path, args: &[&str]) -> Result<(), String> {
    git_stdout(cwd, args).map(|_| ())
}

pub fn repo_root(start: &Path) -> Result<PathBuf, String> {
    let cwd = if start.exists() { start } else { Path::new("/") };
    let out = git_stdout(cwd, &["rev-parse", "--show-toplevel"])?;
    let root = out.trim();
    if root.is_empty() {
        return Err("not a git repository".to_string());
    }
    Ok(PathBuf::from(root))
}

/// One page of `git log`. `filters` are passed through untouched; anything
/// after a `--` is treated as a pathspec.
pub fn list_commits(
    repo_root: &Path,
    filters: &[String],
    offset: usize,
    count: usize,
) -> Result<Vec<Commit>, String> {
    let skip = format!("--skip={}", offset);
    let max = format!("--max-count={}", count);
    let format = "--pretty=format:%x1e%H%x1f%P%x1f%an <%ae>%x1f%ad%x1f%s%x1f%b%x1f";

    let mut args: Vec<&str> = vec![
        "log",
        "--no-color",
        "--date=format:%Y-%m-%d %H:%M",
        "--name-status",
        "-M",
        format,
        skip.as_str(),
        max.as_str(),
    ];

    let split = filters.iter().position(|f| f == "--");
    let (revs, paths) = match split {
        Some(i) => (&filters[..i], &filters[i + 1..]),
        None => (filters, &filters[filters.len()..]),
    };
    args.extend(revs.iter().map(|s| s.as_str()));
    args.push("--");
    args.extend(paths.iter().map(|s| s.as_str()));

    let text = git_stdout(repo_root, &args)?;
    Ok(parse_log(&text))
}

fn parse_log(text: &str) -> Vec<Commit> {
    let mut commits = Vec::new();

    for record in text.split(RECORD_SEP) {
        if record.trim().is_empty() {
            continue;
        }
        let mut it = record.splitn(7, FIELD_SEP);
        let id = it.next().unwrap_or("").trim().to_string();
        if id.is_empty() {
            continue;
        }
        let parents: Vec<String> = it
            .next()
            .unwrap_or("")
            .split_whitespace()
            .map(|s| s.to_string())
            .collect();
        let author = it.next().unwrap_or("").trim().to_string();
        let date = it.next().unwrap_or("").trim().to_string();
        let subject = it.next().unwrap_or("").trim().to_string();
        let body = it.next().unwrap_or("").trim_end().to_string();
        let status = it.next().unwrap_or("");

        // Merges get no name-status output; leave their paths unknown.
        let changes = if parents.len() > 1 {
            None
        } else {
            Some(parse_name_status(status))
        };

        commits.push(Commit {
            id,
            parents,
            author,
            date,
            subject,
            body,
            changes,
        });
    }

    commits
}

fn parse_name_status(text: &str) -> BTreeMap<String, ChangeKind> {
    let mut files = BTreeMap::new();

    for line in text.lines() {
        let t = line.trim();
        if t.is_empty() {
            continue;
        }

        let parts: Vec<&str> = t.split('\t').collect();
        let status = parts[0].trim();
        let kind = ChangeKind::from_status(status);
        if status.starts_with('R') || status.starts_with('C') {
            let Some(path) = parts.get(2).filter(|p| !p.is_empty()) else {
                continue;
            };
            if let Some(old) = parts.get(1).filter(|p| !p.is_empty()) {
                if kind == ChangeKind::Renamed {
                    files.insert(old.to_string(), ChangeKind::Renamed);
                }
            }
            files.insert(path.to_string(), kind);
        } else if let Some(path) = parts.get(1).filter(|p| !p.is_empty()) {
            files.insert(path.to_string(), kind);
        }
    }

    files
}

pub fn commit_parents(repo_root: &Path, hash: &str) -> Result<Vec<String>, String> {
    let text = git_stdout(repo_root, &["rev-list", "--parents", "-n", "1", hash])?;
    let line = text.lines().next().unwrap_or("");
    Ok(line
        .split_whitespace()
        .skip(1)
        .map(|s| s.to_string())
        .collect())
}

/// Patch of a commit against its first parent, or the full patch for a root commit.
pub fn show_commit_diff(repo_root: &Path, key: &DiffKey) -> Result<String, String> {
    let context = format!("-U{}", key.context);
    let parents = commit_parents(repo_root, &key.commit)?;

    let mut args: Vec<&str> = Vec::new();
    match parents.first() {
        Some(first_parent) => {
            args.extend(["diff", "--no-color", "--no-ext-diff", "--find-renames"]);
            args.push(context.as_str());
            if key.ignore_whitespace {
                args.push("-w");
            }
            args.push(first_parent.as_str());
            args.push(key.commit.as_str());
        }
        None => {
            args.extend(["show", "--no-color", "--no-ext-diff", "--format=", "--patch"]);
            args.push(context.as_str());
            if key.ignore_whitespace {
                args.push("-w");
            }
            args.push(key.commit.as_str());
        }
    }

    git_stdout(repo_root, &args)
}

pub fn blame_line(repo_root: &Path, target: &BlameTarget) -> Result<BlameOrigin, String> {
    let range = format!("{},{}", target.line, target.line);
    let text = git_stdout(
        repo_root,
        &[
            "blame",
            "--porcelain",
            "-L",
            range.as_str(),
            target.rev.as_str(),
            "--",
            target.path.as_str(),
        ],
    )?;
    parse_blame_porcelain(&text).ok_or_else(|| "unexpected blame output".to_string())
}

fn parse_blame_porcelain(text: &str) -> Option<BlameOrigin> {
    let mut lines = text.lines();
    let mut first = lines.next()?.split_whitespace();
    let commit = first.next()?.to_string();
    let line = first.next()?.parse().ok()?;

    let path = lines
        .take_while(|l| !l.starts_with('\t'))
        .find_map(|l| l.strip_prefix("filename "))?
        .to_string();

    Some(BlameOrigin { commit, path, line })
}

/// Local branches, remote branches and tags, plus the commit HEAD points at.
pub fn list_references(repo_root: &Path) -> Result<(Vec<Reference>, Option<String>), String> {
    let text = git_stdout(
        repo_root,
        &[
            "for-each-ref",
            "--format=%(refname)%09%(objectname)%09%(*objectname)%09%(HEAD)",
            "refs/heads",
            "refs/remotes",
            "refs/tags",
        ],
    )?;

    let mut refs = Vec::new();
    for line in text.lines() {
        let mut it = line.split('\t');
        let full = it.next().unwrap_or("").trim();
        let object = it.next().unwrap_or("").trim();
        let peeled = it.next().unwrap_or("").trim();
        let head = it.next().unwrap_or("").trim();

        let (kind, name) = if let Some(n) = full.strip_prefix("refs/heads/") {
            (RefKind::LocalBranch, n)
        } else if let Some(n) = full.strip_prefix("refs/remotes/") {
            if n.ends_with("/HEAD") {
                continue;
            }
            (RefKind::RemoteBranch, n)
        } else if let Some(n) = full.strip_prefix("refs/tags/") {
            (RefKind::Tag, n)
        } else {
            continue;
        };
        if name.is_empty() || object.is_empty() {
            continue;
        }

        let target = if peeled.is_empty() { object } else { peeled };
        refs.push(Reference {
            name: name.to_string(),
            kind,
            target: target.to_string(),
            is_head: head == "*",
        });
    }

    let head = git_stdout(repo_root, &["rev-parse", "-q", "--verify", "HEAD"])
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok((refs, head))
}

pub fn cherry_pick(repo_root: &Path, commit: &str) -> Result<(), String> {
    git_unit(repo_root, &["cherry-pick", commit])
}

pub fn revert(repo_root: &Path, commit: &str) -> Result<(), String> {
    git_unit(repo_root, &["revert", "--no-edit", commit])
}

pub fn reset(repo_root: &Path, commit: &str, hard: bool) -> Result<(), String> {
    let mode = if hard { "--hard" } else { "--soft" };
    git_unit(repo_root, &["reset", mode, commit])
}

pub fn create_branch(repo_root: &Path, name: &str, commit: &str) -> Result<(), String> {
    git_unit(repo_root, &["branch", name, commit])
}

pub fn create_tag(repo_root: &Path, name: &str, commit: &str) -> Result<(), String> {
    git_unit(repo_root, &["tag", name, commit])
}

pub fn delete_branch(repo_root: &Path, name: &str) -> Result<(), String> {
    git_unit(repo_root, &["branch", "-D", name])
}

pub fn delete_tag(repo_root: &Path, name: &str) -> Result<(), String> {
    git_unit(repo_root, &["tag", "-d", name])
}

/// `remote_branch` is the short remote ref, e.g. `origin/feature`.
pub fn delete_remote_branch(repo_root: &Path, remote_branch: &str) -> Result<(), String> {
    let Some((remote, branch)) = remote_branch.split_once('/') else {
        return Err(format!("not a remote branch: {}", remote_branch));
    };
    git_unit(repo_root, &["push", remote, "--delete", branch])
}

pub fn push_branch(repo_root: &Path, remote: &str, name: &str) -> Result<(), String> {
    git_unit(repo_root, &["push", remote, name])
}

pub fn push_tag(repo_root: &Path, remote: &str, name: &str) -> Result<(), String> {
    git_unit(repo_root, &["push", remote, "tag", name])
}

pub fn rename_branch(repo_root: &Path, old: &str, new: &str) -> Result<(), String> {
    git_unit(repo_root, &["branch", "-m", old, new])
}

/// Run an arbitrary git subcommand typed by the user. Returns stdout, or
/// stderr (falling back to stdout) when git exits non-zero.
pub fn run_command(repo_root: &Path, args: &[String]) -> Result<String, String> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let out = run_git(repo_root, &args).map_err(|e| e.to_string())?;
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    if out.status.success() {
        return Ok(stdout);
    }
    let stderr = String::from_utf8_lossy(&out.stderr).trim_end().to_string();
    let detail = if stderr.is_empty() { stdout.trim_end().to_string() } else { stderr };
    tracing::warn!(target: "histview::git", "git {} exited with {}", args.join(" "), out.status);
    Err(detail)
}

/// Tags cannot be renamed in place: create the new name, then drop the old one.
pub fn rename_tag(repo_root: &Path, old: &str, new: &str) -> Result<(), String> {
    git_unit(repo_root, &["tag", new, old])?;
    delete_tag(repo_root, old)
}
