//! The interaction variants and their orchestration.
//!
//! Each variant is a capability bundle over the same selection loop: where
//! candidates come from, how they are filtered and sorted, and what
//! consumes the result. The hidden helper pane is swapped in only once the
//! candidate work is done, and the [`SwapGuard`] restores the original view
//! on every exit path.

use anyhow::{Result, bail};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::align::ScreenPos;
use crate::matching::{arrange, char_slice, discover, parse_tiers, search_lines};
use crate::session::screen::{Key, Screen};
use crate::session::{
    CaseMode, Direction, Outcome, SelectionContext, Selector, filter_direction,
    sort_by_proximity,
};
use crate::tmux::options::OptionCache;
use crate::tmux::{SwapGuard, SwapMode, Tmux, load_env_file, pipe_to_shell, spawn_detached};

const DEFAULT_LABEL_CHARS: &str = "asdghklqwertyuiopzxcvbnmfj;";
const DEFAULT_CANCEL_KEYS: &str = "Escape Enter ^C";
const DEFAULT_NEXT_BATCH_KEYS: &str = "Space n";

const DEFAULT_QUICKCOPY_TIERS: &[&[&str]] =
    &[&["urls", "abspaths"], &["paths", "filenames"], &["lines"]];
const DEFAULT_QUICKOPEN_TIERS: &[&[&str]] = &[&["urls"], &["abspaths", "paths"]];

/// The selectable interaction variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MotionSearch,
    MotionLines,
    EasyCopy,
    QuickCopy,
    QuickOpen,
}

impl Action {
    pub fn parse(name: &str) -> Option<Action> {
        match name {
            "easymotion-search" => Some(Action::MotionSearch),
            "easymotion-lines" => Some(Action::MotionLines),
            "easycopy" => Some(Action::EasyCopy),
            "quickcopy" => Some(Action::QuickCopy),
            "quickopen" => Some(Action::QuickOpen),
            _ => None,
        }
    }
}

/// Arguments the wrapper hands to the respawned internal process.
#[derive(Debug, Clone)]
pub struct InternalArgs {
    pub action: String,
    pub target: String,
    pub hidden_target: String,
    pub hidden_window: String,
    pub orig_window: String,
    pub swap_mode: String,
    pub search_nkeys: Option<usize>,
    pub search_direction: Option<String>,
}

/// Wrapper entry: stage the hidden helper window and respawn it running the
/// internal process. Returns as soon as tmux accepts the respawn.
pub fn run_jump(
    action: &str,
    target: Option<&str>,
    search_nkeys: Option<usize>,
    search_direction: Option<&str>,
) -> Result<()> {
    let tmux = Tmux::locate()?;
    let pane = tmux.pane_info(target)?;
    // Swapping zoomed panes confuses tmux, so those switch whole windows
    // instead.
    let (hidden, mode) = if pane.zoomed {
        (tmux.background_window()?, SwapMode::WindowSwitch)
    } else {
        (tmux.window_sized_like(pane.size)?, SwapMode::PaneSwap)
    };
    info!(action, target = %pane.pane_id, mode = mode.as_str(), "staging helper pane");

    let exe = std::env::current_exe()?;
    let mut argv: Vec<String> = vec![
        exe.display().to_string(),
        "internal".into(),
        action.into(),
        "-t".into(),
        pane.pane_id.clone(),
        "--hidden-t".into(),
        hidden.pane_id.clone(),
        "--hidden-window".into(),
        hidden.window_id.clone(),
        "--orig-window".into(),
        pane.window_id.clone(),
        "--swap-mode".into(),
        mode.as_str().into(),
    ];
    if let Some(n) = search_nkeys {
        argv.push("--search-nkeys".into());
        argv.push(n.to_string());
    }
    if let Some(d) = search_direction {
        argv.push("--search-direction".into());
        argv.push(d.to_string());
    }
    let cmdline = shell_words::join(argv.iter().map(String::as_str));
    tmux.respawn_pane(&hidden.pane_id_full(), &cmdline)?;
    Ok(())
}

/// Internal entry, running inside the helper pane. Faults are printed and
/// held for acknowledgment so the pane swap is never silently lost; the
/// guard cleanup runs afterwards regardless.
pub fn run_internal(args: &InternalArgs) -> Result<()> {
    let tmux = Tmux::locate()?;
    let Some(mode) = SwapMode::parse(&args.swap_mode) else {
        bail!("unknown swap mode {:?}", args.swap_mode);
    };
    let mut guard = SwapGuard::new(
        &tmux,
        mode,
        &args.target,
        &args.hidden_target,
        &args.hidden_window,
        &args.orig_window,
    );
    if let Err(err) = run_selection(&tmux, &mut guard, args) {
        eprintln!("Error:");
        eprintln!("{err:?}");
        eprintln!("ENTER to continue ...");
        let mut ack = String::new();
        let _ = io::stdin().read_line(&mut ack);
    }
    Ok(())
}

fn run_selection(tmux: &Tmux, guard: &mut SwapGuard, args: &InternalArgs) -> Result<()> {
    let Some(action) = Action::parse(&args.action) else {
        // Indistinguishable from a user cancel by design.
        info!(action = %args.action, "unknown action; canceled");
        return Ok(());
    };
    let ctx = SelectionContext::capture(tmux, &args.target)?;
    let opts = OptionCache::global(tmux);

    match action {
        Action::MotionSearch | Action::MotionLines => {
            run_motion(tmux, guard, &ctx, &opts, args, action == Action::MotionSearch)
        }
        Action::EasyCopy => run_easycopy(guard, &ctx, &opts, args),
        Action::QuickCopy => run_quickselect(guard, &ctx, &opts, QuickSink::Copy),
        Action::QuickOpen => run_quickselect(guard, &ctx, &opts, QuickSink::Open),
    }
}

/// Needle-search tuning shared by the motion and easy-copy flows.
struct MotionConfig {
    nkeys: usize,
    direction: Direction,
    min_spacing: usize,
    case: CaseMode,
    flash: Duration,
}

impl MotionConfig {
    fn load(opts: &OptionCache, args: &InternalArgs) -> Result<MotionConfig> {
        Ok(MotionConfig {
            nkeys: args.search_nkeys.unwrap_or(1).max(1),
            direction: Direction::parse(args.search_direction.as_deref()),
            min_spacing: opts.get_usize("@quickhop-min-match-spacing", 2)?,
            case: CaseMode::parse(&opts.get_or("@quickhop-case-sensitive-search", "upper")?),
            flash: Duration::from_secs_f64(opts.get_f64("@quickhop-flash-time", 0.5)?),
        })
    }
}

fn build_selector(
    ctx: &SelectionContext,
    opts: &OptionCache,
    label_chars: String,
    next_batch_keys: Vec<Key>,
) -> Result<Selector> {
    let cancel_keys = Key::parse_list(&opts.get_or("@quickhop-cancel-key", DEFAULT_CANCEL_KEYS)?);
    let screen = Screen::enter(ctx.pane.size, ctx.display_lines.clone(), cancel_keys)?;
    Ok(Selector::new(
        screen,
        label_chars,
        next_batch_keys,
        ctx.pane.size.width,
    ))
}

/// One labeled single-position pass: gather locations (needle search or
/// whole lines), apply the direction filter and an optional anchor filter,
/// sort by proximity, then narrow.
fn select_position(
    selector: &mut Selector,
    ctx: &SelectionContext,
    cfg: &MotionConfig,
    search: bool,
    after: Option<ScreenPos>,
) -> Result<Outcome<ScreenPos>> {
    let mut locations = if search {
        let needle = match selector.input_needle(cfg.nkeys)? {
            Outcome::Resolved(n) => n,
            _ => return Ok(Outcome::Canceled),
        };
        search_lines(
            &ctx.display_lines,
            &needle,
            cfg.min_spacing,
            cfg.case.match_case(&needle),
        )
    } else {
        ctx.line_starts()
    };
    locations = filter_direction(locations, cfg.direction, ctx.pane.cursor);
    if let Some(anchor) = after {
        locations.retain(|pos| pos.is_after(anchor));
    }
    if locations.is_empty() {
        return Ok(Outcome::Canceled);
    }
    let origin = after.unwrap_or(ctx.pane.cursor);
    sort_by_proximity(&mut locations, origin, ctx.pane.size.width);
    debug!(count = locations.len(), "jump targets");
    selector.pick_position(locations)
}

fn run_motion(
    tmux: &Tmux,
    guard: &mut SwapGuard,
    ctx: &SelectionContext,
    opts: &OptionCache,
    args: &InternalArgs,
    search: bool,
) -> Result<()> {
    let cfg = MotionConfig::load(opts, args)?;
    let label_chars = opts.get_or("@quickhop-label-chars", DEFAULT_LABEL_CHARS)?;
    let mut selector = build_selector(ctx, opts, label_chars, Vec::new())?;
    guard.show()?;
    selector.screen.render()?;

    if let Outcome::Resolved(pos) = select_position(&mut selector, ctx, &cfg, search, None)? {
        info!(x = pos.x, y = pos.y, "jump resolved");
        tmux.move_cursor(&ctx.pane.pane_id, pos)?;
    }
    Ok(())
}

fn run_easycopy(
    guard: &mut SwapGuard,
    ctx: &SelectionContext,
    opts: &OptionCache,
    args: &InternalArgs,
) -> Result<()> {
    let cfg = MotionConfig::load(opts, args)?;
    let label_chars = opts.get_or("@quickhop-label-chars", DEFAULT_LABEL_CHARS)?;
    let mut selector = build_selector(ctx, opts, label_chars, Vec::new())?;
    guard.show()?;
    selector.screen.render()?;

    let Outcome::Resolved(first) = select_position(&mut selector, ctx, &cfg, true, None)? else {
        return Ok(());
    };
    selector.screen.state.highlight = Some(first);
    selector.screen.render()?;

    let Outcome::Resolved(second) = select_position(&mut selector, ctx, &cfg, true, Some(first))?
    else {
        return Ok(());
    };
    // The needle's last char lands inside the match, so the end column
    // extends by one less than the needle length.
    let second = ScreenPos::new(second.x + cfg.nkeys - 1, second.y);

    let start = ctx.map.logical_at(first);
    let end = ctx.map.logical_at(second);
    let text = char_slice(&ctx.copy_text, start, end + 1).to_string();
    info!(start, end, len = text.len(), "easycopy span");
    let copy_command = opts.get_or("@quickhop-copy-command", "tmux load-buffer -")?;
    pipe_to_shell(&copy_command, &text)?;

    selector.screen.flash_ranges(&[(first, second)], cfg.flash, None)?;
    Ok(())
}

/// What consumes a quick-select result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuickSink {
    Copy,
    Open,
}

impl QuickSink {
    fn option_prefix(self) -> &'static str {
        match self {
            QuickSink::Copy => "@quickhop-quickcopy-",
            QuickSink::Open => "@quickhop-quickopen-",
        }
    }

    fn default_tiers(self) -> &'static [&'static [&'static str]] {
        match self {
            QuickSink::Copy => DEFAULT_QUICKCOPY_TIERS,
            QuickSink::Open => DEFAULT_QUICKOPEN_TIERS,
        }
    }
}

/// Tier lists and batch tuning for one quick-select flow.
struct QuickConfig {
    tiers: Vec<Vec<String>>,
    min_match_len: usize,
    pack_tiers: bool,
    next_batch_keys: Vec<Key>,
    label_chars: String,
}

impl QuickConfig {
    fn load(opts: &OptionCache, sink: QuickSink) -> Result<QuickConfig> {
        let prefix = sink.option_prefix();

        // Tiers configure as `<prefix>match-<tier>-<index>` user option
        // lists; the set ends at the first tier with no entries.
        let mut tiers: Vec<Vec<String>> = Vec::new();
        loop {
            let specs = opts.get_list(&format!("{prefix}match-{}", tiers.len()), true)?;
            if specs.is_empty() {
                break;
            }
            tiers.push(specs);
        }
        if tiers.is_empty() {
            tiers = sink
                .default_tiers()
                .iter()
                .map(|tier| tier.iter().map(|s| s.to_string()).collect())
                .collect();
        }

        let next_batch_keys = Key::parse_list(&opts.get_or(
            &format!("{prefix}next-batch-char"),
            DEFAULT_NEXT_BATCH_KEYS,
        )?);
        // Next-batch chars cannot double as label chars.
        let label_chars = opts
            .get_or("@quickhop-label-chars", DEFAULT_LABEL_CHARS)?
            .chars()
            .filter(|&c| !next_batch_keys.contains(&Key::Char(c)))
            .collect();

        Ok(QuickConfig {
            tiers,
            min_match_len: opts.get_usize(&format!("{prefix}min-match-len"), 4)?,
            pack_tiers: opts.get_bool(&format!("{prefix}pack-tiers"), true)?,
            next_batch_keys,
            label_chars,
        })
    }
}

fn run_quickselect(
    guard: &mut SwapGuard,
    ctx: &SelectionContext,
    opts: &OptionCache,
    sink: QuickSink,
) -> Result<()> {
    let quick = QuickConfig::load(opts, sink)?;
    let sources = parse_tiers(&quick.tiers)?;
    let candidates = discover(&ctx.copy_text, &sources, quick.min_match_len, &ctx.map);
    if candidates.is_empty() {
        return Ok(());
    }
    info!(count = candidates.len(), "quick-select candidates");
    let batches = arrange(
        candidates,
        quick.pack_tiers,
        ctx.copy_text.chars().count(),
    );

    let mut selector =
        build_selector(ctx, opts, quick.label_chars.clone(), quick.next_batch_keys.clone())?;
    guard.show()?;

    let Outcome::Resolved(group) = selector.run_batches(batches)? else {
        return Ok(());
    };
    let text = group[0].text.clone();

    match sink {
        QuickSink::Copy => {
            let copy_command = opts.get_or("@quickhop-copy-command", "tmux load-buffer -")?;
            pipe_to_shell(&copy_command, &text)?;

            let mut ranges: Vec<(ScreenPos, ScreenPos)> =
                group.iter().map(|c| (c.disp_start, c.disp_end)).collect();
            if opts.get_bool("@quickhop-flash-only-one", true)? && ranges.len() > 1 {
                ranges = ranges.split_off(ranges.len() - 1);
            }
            let flash = Duration::from_secs_f64(opts.get_f64("@quickhop-flash-time", 0.5)?);
            let preflash =
                Duration::from_secs_f64(opts.get_f64("@quickhop-preflash-time", 0.05)?);
            selector.screen.flash_ranges(&ranges, flash, Some(preflash))?;
        }
        QuickSink::Open => {
            let default_open = if cfg!(target_os = "macos") {
                "open"
            } else {
                "xdg-open"
            };
            let opener = opts.get_or(&format!("{}open-command", sink.option_prefix()), default_open)?;
            let env_file = opts.get_or(
                &format!("{}env-file", sink.option_prefix()),
                "~/.tmux-quickhop-env",
            )?;
            let env: HashMap<String, String> = load_env_file(&expand_home(&env_file));
            spawn_detached(&format!("{opener} {}", shell_words::quote(&text)), &env)?;
        }
    }
    Ok(())
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_parse() {
        assert_eq!(Action::parse("easymotion-search"), Some(Action::MotionSearch));
        assert_eq!(Action::parse("easymotion-lines"), Some(Action::MotionLines));
        assert_eq!(Action::parse("easycopy"), Some(Action::EasyCopy));
        assert_eq!(Action::parse("quickcopy"), Some(Action::QuickCopy));
        assert_eq!(Action::parse("quickopen"), Some(Action::QuickOpen));
        assert_eq!(Action::parse("easymotion-paragraphs"), None);
    }

    #[test]
    fn default_tier_presets_parse() {
        for tiers in [DEFAULT_QUICKCOPY_TIERS, DEFAULT_QUICKOPEN_TIERS] {
            let tiers: Vec<Vec<String>> = tiers
                .iter()
                .map(|t| t.iter().map(|s| s.to_string()).collect())
                .collect();
            assert!(parse_tiers(&tiers).is_ok());
        }
    }

    #[test]
    fn home_expansion_only_touches_tilde_slash() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("rel/path"), PathBuf::from("rel/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/x"), home.join("x"));
        }
    }
}
