use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, EventStream},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    env, io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

mod app;
mod clipboard;
mod config;
mod diff;
mod diff_cache;
mod dispatch;
mod error;
mod fetch;
mod git_ops;
mod graph;
mod input;
mod jump;
mod logging;
mod model;
mod references;
mod search;
mod source;
mod theme;
mod ui;
mod view;

use app::App;
use config::Settings;
use dispatch::Input;
use source::GitSource;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "usage: histview [--version] [path] [git-log-args...] [-- paths...]";

/// Where to open and what to pass to `git log`.
#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    path: PathBuf,
    filters: Vec<String>,
}

/// The first argument names the repository when it is an existing directory;
/// everything else goes to `git log` untouched. Nothing before `--` means `--all`.
fn parse_args(args: Vec<String>, cwd: PathBuf, is_dir: impl Fn(&Path) -> bool) -> CliArgs {
    let mut args = args.into_iter().peekable();
    let path = match args.peek() {
        Some(first) if !first.starts_with('-') && is_dir(Path::new(first)) => {
            let p = PathBuf::from(first);
            args.next();
            p
        }
        _ => cwd,
    };

    let mut filters: Vec<String> = args.collect();
    let revs = filters.iter().position(|f| f == "--").unwrap_or(filters.len());
    if revs == 0 {
        filters.insert(0, "--all".to_string());
    }
    CliArgs { path, filters }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let _ = dotenvy::dotenv();

    if let Some(arg) = env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("histview {}", VERSION);
                return Ok(());
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                return Ok(());
            }
            _ => {}
        }
    }

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let cli = parse_args(env::args().skip(1).collect(), cwd, Path::is_dir);

    // Logging first so settings warnings are captured; the ring is resized after.
    let log_file = env::var_os(logging::LOG_FILE_ENV).map(PathBuf::from);
    let debug_log = logging::init(Settings::default().debug_log_capacity, log_file.as_deref());
    let settings = Settings::load();
    debug_log.set_capacity(settings.debug_log_capacity);

    let repo_root = match git_ops::repo_root(&cli.path) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("histview: {}: {}", cli.path.display(), e);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };
    tracing::info!("opening {} with {:?}", repo_root.display(), cli.filters);

    let source = Arc::new(GitSource::new(repo_root, settings.remote.clone()));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(
        source,
        cli.filters,
        settings,
        config::settings_file_path(),
        debug_log,
    );

    let mut event_stream = EventStream::new();

    loop {
        app.drain();
        app.tick();

        let mut zones = Vec::new();
        terminal.draw(|f| {
            zones = ui::draw_ui(f, &mut app);
        })?;
        app.zones = zones;

        // Redraw quickly while fetches or scans are running.
        let tick = if app.is_busy() { 16 } else { 100 };
        let poll_timeout = tokio::time::sleep(Duration::from_millis(tick));
        tokio::pin!(poll_timeout);

        tokio::select! {
            Some(completion) = app.model.recv() => {
                app.on_completion(completion);
            }
            Some(event_result) = event_stream.next() => {
                match event_result {
                    Ok(event) => {
                        if let Some(input) = Input::from_event(&event) {
                            app.handle_input(input);
                        }
                    }
                    Err(e) => tracing::warn!("terminal event error: {}", e),
                }
            }
            _ = &mut poll_timeout => {}
        }

        if let Some(text) = app.take_pending_clipboard() {
            let status = clipboard::copy(terminal.backend_mut(), &text);
            app.set_status(status);
        }

        if app.should_quit {
            break;
        }
    }

    let cancelled = app.model.cancel_all();
    tracing::debug!("exit, cancelled {} fetches", cancelled);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_filters_are_all() {
        let cli = parse_args(vec![], PathBuf::from("/work"), |_| false);
        assert_eq!(cli.path, PathBuf::from("/work"));
        assert_eq!(cli.filters, args(&["--all"]));
    }

    #[test]
    fn test_path_then_log_args() {
        let cli = parse_args(
            args(&["repo", "main", "--author=ann", "--", "src"]),
            PathBuf::from("/work"),
            |p| p == Path::new("repo"),
        );
        assert_eq!(cli.path, PathBuf::from("repo"));
        assert_eq!(cli.filters, args(&["main", "--author=ann", "--", "src"]));
    }

    #[test]
    fn test_pathspec_only_still_walks_all_refs() {
        let cli = parse_args(args(&["--", "README.md"]), PathBuf::from("/work"), |_| false);
        assert_eq!(cli.filters, args(&["--all", "--", "README.md"]));
    }

    #[test]
    fn test_revision_that_is_not_a_dir_is_a_filter() {
        let cli = parse_args(args(&["v1.0..HEAD"]), PathBuf::from("/work"), |_| false);
        assert_eq!(cli.path, PathBuf::from("/work"));
        assert_eq!(cli.filters, args(&["v1.0..HEAD"]));
    }
}
