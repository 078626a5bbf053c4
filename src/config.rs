/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub bubble: BubbleConfig,
    pub grid: GridConfig,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    /// Countdown granted on level 1, in seconds.
    pub base_time_secs: u32,
    /// The countdown never shrinks below this, no matter the level.
    pub min_time_secs: u32,
}

#[derive(Clone, Debug)]
pub struct BubbleConfig {
    /// Bubble width in terminal columns at the start of a run.
    pub start_size: usize,
    /// Bubbles never shrink below this width.
    pub min_size: usize,
    /// Columns removed from the bubble width at each shrink step.
    pub shrink_step: usize,
    /// A shrink step fires when entering a level divisible by this.
    pub shrink_every: u32,
    /// Blank columns/rows between adjacent bubbles.
    pub margin: usize,
}

#[derive(Clone, Debug)]
pub struct GridConfig {
    /// Terminal rows above the grid kept free for the HUD.
    pub reserved_rows: usize,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    bubble: TomlBubble,
    #[serde(default)]
    grid: TomlGrid,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_base_time")]
    base_time_secs: u32,
    #[serde(default = "default_min_time")]
    min_time_secs: u32,
}

#[derive(Deserialize, Debug)]
struct TomlBubble {
    #[serde(default = "default_start_size")]
    start_size: usize,
    #[serde(default = "default_min_size")]
    min_size: usize,
    #[serde(default = "default_shrink_step")]
    shrink_step: usize,
    #[serde(default = "default_shrink_every")]
    shrink_every: u32,
    #[serde(default = "default_margin")]
    margin: usize,
}

#[derive(Deserialize, Debug)]
struct TomlGrid {
    #[serde(default = "default_reserved_rows")]
    reserved_rows: usize,
}

// ── Defaults ──

fn default_base_time() -> u32 { 30 }
fn default_min_time() -> u32 { 10 }

fn default_start_size() -> usize { 7 }
fn default_min_size() -> usize { 4 }
fn default_shrink_step() -> usize { 1 }
fn default_shrink_every() -> u32 { 5 }    // bubbles shrink entering level 5, 10, ...
fn default_margin() -> usize { 1 }

fn default_reserved_rows() -> usize { 3 } // HUD + message + gap

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            base_time_secs: default_base_time(),
            min_time_secs: default_min_time(),
        }
    }
}

impl Default for TomlBubble {
    fn default() -> Self {
        TomlBubble {
            start_size: default_start_size(),
            min_size: default_min_size(),
            shrink_step: default_shrink_step(),
            shrink_every: default_shrink_every(),
            margin: default_margin(),
        }
    }
}

impl Default for TomlGrid {
    fn default() -> Self {
        TomlGrid {
            reserved_rows: default_reserved_rows(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default())
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        GameConfig::from_toml(load_toml(&search_dirs))
    }

    fn from_toml(toml_cfg: TomlConfig) -> Self {
        GameConfig {
            timing: TimingConfig {
                base_time_secs: toml_cfg.timing.base_time_secs.max(1),
                min_time_secs: toml_cfg.timing.min_time_secs.max(1),
            },
            bubble: BubbleConfig {
                start_size: toml_cfg.bubble.start_size.max(1),
                min_size: toml_cfg.bubble.min_size.max(1),
                shrink_step: toml_cfg.bubble.shrink_step,
                shrink_every: toml_cfg.bubble.shrink_every.max(1),
                margin: toml_cfg.bubble.margin,
            },
            grid: GridConfig {
                reserved_rows: toml_cfg.grid.reserved_rows,
            },
        }
    }
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so /usr/bin/popit → /usr/games/popit
        // still finds data relative to the real binary.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/popit)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/popit");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory (/usr/share/popit)
    let sys = PathBuf::from("/usr/share/popit");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    // 5. Fallback
    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}
