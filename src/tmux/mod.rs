//! The tmux side of the house: process invocation, pane capture and
//! metadata, the hidden helper window, and the copy/open sinks.
//!
//! Every tmux call is an argv-vector exec of the resolved binary, never a
//! shell string. Multi-step operations are joined with `;` into a single
//! invocation so tmux applies them atomically.

pub mod options;

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, warn};

use crate::align::{ScreenPos, Viewport};

#[derive(Debug, Error)]
pub enum TmuxError {
    #[error("tmux binary not found on PATH")]
    NotFound(#[from] which::Error),
    #[error("failed to invoke tmux: {0}")]
    Io(#[from] io::Error),
    #[error("tmux {args:?} exited with status {status}")]
    Failed { args: Vec<String>, status: i32 },
    #[error("unexpected tmux output: {0}")]
    Parse(String),
}

pub type TmuxResult<T> = Result<T, TmuxError>;

/// Handle to the tmux binary.
#[derive(Debug, Clone)]
pub struct Tmux {
    bin: PathBuf,
}

/// Identity, geometry, and cursor of one pane at capture time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneInfo {
    pub session_id: String,
    pub window_id: String,
    pub pane_id: String,
    pub size: Viewport,
    pub zoomed: bool,
    /// Copy-mode cursor when the pane is in copy-mode, else the live cursor.
    pub cursor: ScreenPos,
}

impl PaneInfo {
    pub fn window_id_full(&self) -> String {
        format!("{}:{}", self.session_id, self.window_id)
    }

    pub fn pane_id_full(&self) -> String {
        format!("{}:{}.{}", self.session_id, self.window_id, self.pane_id)
    }
}

const PANE_FORMAT: &str = "#{session_id} #{window_id} #{pane_id} #{pane_width} #{pane_height} \
                           #{window_zoomed_flag} #{cursor_x} #{cursor_y} #{copy_cursor_x} \
                           #{copy_cursor_y} #{pane_mode}";

impl Tmux {
    /// Resolve the tmux binary from PATH.
    pub fn locate() -> TmuxResult<Tmux> {
        let bin = which::which("tmux")?;
        Ok(Tmux { bin })
    }

    /// Run one tmux command and return its stdout.
    pub fn run(&self, args: &[&str]) -> TmuxResult<String> {
        debug!(?args, "tmux");
        let output = Command::new(&self.bin)
            .args(args)
            .stdin(Stdio::null())
            .output()?;
        if !output.status.success() {
            return Err(TmuxError::Failed {
                args: args.iter().map(|s| s.to_string()).collect(),
                status: output.status.code().unwrap_or(-1),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run several tmux commands in one invocation, `;`-separated.
    pub fn run_many(&self, argsets: &[Vec<String>]) -> TmuxResult<()> {
        if argsets.is_empty() {
            return Ok(());
        }
        let mut all: Vec<&str> = Vec::new();
        for set in argsets {
            if !all.is_empty() {
                all.push(";");
            }
            all.extend(set.iter().map(String::as_str));
        }
        self.run(&all)?;
        Ok(())
    }

    fn first_line(&self, args: &[&str]) -> TmuxResult<String> {
        let out = self.run(args)?;
        Ok(out.lines().next().unwrap_or_default().to_string())
    }

    /// Capture pane contents; `joined` unwraps the soft line breaks (`-J`).
    /// The trailing newline tmux appends is dropped.
    pub fn capture_pane(&self, target: &str, joined: bool) -> TmuxResult<String> {
        let mut args = vec!["capture-pane", "-p"];
        if joined {
            args.push("-J");
        }
        args.extend(["-t", target]);
        let out = self.run(&args)?;
        Ok(out.strip_suffix('\n').unwrap_or(&out).to_string())
    }

    pub fn pane_info(&self, target: Option<&str>) -> TmuxResult<PaneInfo> {
        let mut args = vec!["display-message", "-p"];
        if let Some(t) = target {
            args.extend(["-t", t]);
        }
        args.push(PANE_FORMAT);
        let line = self.first_line(&args)?;
        parse_pane_info(&line)
    }

    /// Create a detached background window running `/bin/cat`.
    pub fn background_window(&self) -> TmuxResult<PaneInfo> {
        let id = self.first_line(&[
            "new-window",
            "-dP",
            "-F",
            "#{session_id}:#{window_id}",
            "/bin/cat",
        ])?;
        self.pane_info(Some(&id))
    }

    /// Create a background window whose pane is trimmed down to `size` by
    /// splitting off the excess. Splitting eats at least one separator
    /// column/row, hence the `+ 1` slack before a split is worth it.
    pub fn window_sized_like(&self, size: Viewport) -> TmuxResult<PaneInfo> {
        let mut pane = self.background_window()?;
        let full = pane.pane_id_full();
        let mut cmds: Vec<Vec<String>> = Vec::new();
        let mut resize = false;
        if pane.size.width > size.width + 1 {
            cmds.push(svec(&["split-window", "-t", &full, "-hd", "/bin/cat"]));
            resize = true;
        }
        if pane.size.height > size.height + 1 {
            cmds.push(svec(&["split-window", "-t", &full, "-vd", "/bin/cat"]));
            resize = true;
        }
        if resize {
            cmds.push(svec(&[
                "resize-pane",
                "-t",
                &full,
                "-x",
                &size.width.to_string(),
                "-y",
                &size.height.to_string(),
            ]));
        }
        self.run_many(&cmds)?;
        pane.size = size;
        Ok(pane)
    }

    /// Move the copy-mode cursor of `target` to `pos` by entering copy-mode
    /// at the top line and issuing counted cursor motions.
    pub fn move_cursor(&self, target: &str, pos: ScreenPos) -> TmuxResult<()> {
        debug!(x = pos.x, y = pos.y, target, "move cursor");
        let mut cmds = vec![
            svec(&["copy-mode", "-t", target]),
            svec(&["send-keys", "-X", "-t", target, "top-line"]),
        ];
        if pos.y > 0 {
            cmds.push(svec(&[
                "send-keys",
                "-X",
                "-t",
                target,
                "-N",
                &pos.y.to_string(),
                "cursor-down",
            ]));
        }
        if pos.x > 0 {
            cmds.push(svec(&[
                "send-keys",
                "-X",
                "-t",
                target,
                "-N",
                &pos.x.to_string(),
                "cursor-right",
            ]));
        }
        self.run_many(&cmds)
    }

    pub fn respawn_pane(&self, target: &str, command: &str) -> TmuxResult<()> {
        self.run(&["respawn-pane", "-k", "-t", target, command])?;
        Ok(())
    }

    pub fn swap_panes(&self, src: &str, dst: &str) -> TmuxResult<()> {
        self.run(&["swap-pane", "-Z", "-s", src, "-t", dst])?;
        Ok(())
    }

    pub fn select_window(&self, target: &str) -> TmuxResult<()> {
        self.run(&["select-window", "-t", target])?;
        Ok(())
    }

    pub fn kill_window(&self, target: &str) -> TmuxResult<()> {
        self.run(&["kill-window", "-t", target])?;
        Ok(())
    }
}

fn svec(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn parse_pane_info(line: &str) -> TmuxResult<PaneInfo> {
    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() < 11 {
        return Err(TmuxError::Parse(line.to_string()));
    }
    let num = |s: &str| s.parse::<usize>().ok();
    let width = num(fields[3]).ok_or_else(|| TmuxError::Parse(line.to_string()))?;
    let height = num(fields[4]).ok_or_else(|| TmuxError::Parse(line.to_string()))?;
    let cursor = (num(fields[6]), num(fields[7]));
    let copy_cursor = (num(fields[8]), num(fields[9]));
    let pick = |pair: (Option<usize>, Option<usize>)| match pair {
        (Some(x), Some(y)) => ScreenPos::new(x, y),
        _ => ScreenPos::new(0, 0),
    };
    Ok(PaneInfo {
        session_id: fields[0].to_string(),
        window_id: fields[1].to_string(),
        pane_id: fields[2].to_string(),
        size: Viewport::new(width, height),
        zoomed: fields[5] == "1",
        cursor: if fields[10] == "copy-mode" {
            pick(copy_cursor)
        } else {
            pick(cursor)
        },
    })
}

/// How the hidden helper pane is brought into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapMode {
    /// Swap the helper pane with the target pane in place.
    PaneSwap,
    /// Switch the active window to the helper window (zoomed targets).
    WindowSwitch,
}

impl SwapMode {
    pub fn parse(value: &str) -> Option<SwapMode> {
        match value {
            "pane-swap" => Some(SwapMode::PaneSwap),
            "window-switch" => Some(SwapMode::WindowSwitch),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SwapMode::PaneSwap => "pane-swap",
            SwapMode::WindowSwitch => "window-switch",
        }
    }
}

/// Scoped custody of the swapped-in helper view.
///
/// Whatever way the selection ends, dropping the guard swaps the original
/// pane back into view and kills the helper window.
pub struct SwapGuard<'a> {
    tmux: &'a Tmux,
    mode: SwapMode,
    target_pane: String,
    hidden_pane: String,
    hidden_window: String,
    orig_window: String,
    shown: bool,
}

impl<'a> SwapGuard<'a> {
    pub fn new(
        tmux: &'a Tmux,
        mode: SwapMode,
        target_pane: &str,
        hidden_pane: &str,
        hidden_window: &str,
        orig_window: &str,
    ) -> SwapGuard<'a> {
        SwapGuard {
            tmux,
            mode,
            target_pane: target_pane.to_string(),
            hidden_pane: hidden_pane.to_string(),
            hidden_window: hidden_window.to_string(),
            orig_window: orig_window.to_string(),
            shown: false,
        }
    }

    /// Bring the helper view in front of the target pane.
    pub fn show(&mut self) -> TmuxResult<()> {
        if self.shown {
            return Ok(());
        }
        match self.mode {
            SwapMode::PaneSwap => self.tmux.swap_panes(&self.hidden_pane, &self.target_pane)?,
            SwapMode::WindowSwitch => self.tmux.select_window(&self.hidden_window)?,
        }
        self.shown = true;
        Ok(())
    }

    fn restore(&mut self) -> TmuxResult<()> {
        if !self.shown {
            return Ok(());
        }
        match self.mode {
            SwapMode::PaneSwap => self.tmux.swap_panes(&self.hidden_pane, &self.target_pane)?,
            SwapMode::WindowSwitch => self.tmux.select_window(&self.orig_window)?,
        }
        self.shown = false;
        Ok(())
    }
}

impl Drop for SwapGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            warn!(%err, "failed to restore swapped pane");
        }
        if let Err(err) = self.tmux.kill_window(&self.hidden_window) {
            warn!(%err, "failed to kill helper window");
        }
    }
}

/// Run a shell command with `data` on stdin. Used for the copy sink, whose
/// default is `tmux load-buffer -`.
pub fn pipe_to_shell(command: &str, data: &str) -> anyhow::Result<()> {
    debug!(command, "copy sink");
    let mut child = Command::new("bash")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(data.as_bytes())?;
    }
    let status = child.wait()?;
    anyhow::ensure!(status.success(), "copy command {command:?} exited with {status}");
    Ok(())
}

/// Launch an opener fully detached from this process and its tty.
pub fn spawn_detached(command: &str, extra_env: &HashMap<String, String>) -> anyhow::Result<()> {
    debug!(command, "open sink");
    Command::new("bash")
        .arg("-c")
        .arg(format!("nohup {command} &>/dev/null & disown"))
        .envs(extra_env)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(())
}

/// Extra environment for the opener, read from a `KEY=VALUE` file. Missing
/// file means no extra environment; malformed lines are skipped.
pub fn load_env_file(path: &Path) -> HashMap<String, String> {
    let mut env = HashMap::new();
    let Ok(contents) = std::fs::read_to_string(path) else {
        return env;
    };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        let mut value = value.to_string();
        let chars: Vec<char> = value.chars().collect();
        if chars.len() >= 2
            && matches!(chars[0], '"' | '\'')
            && matches!(chars[chars.len() - 1], '"' | '\'')
        {
            value = chars[1..chars.len() - 1].iter().collect();
        }
        env.insert(name.to_string(), value);
    }
    env
}
