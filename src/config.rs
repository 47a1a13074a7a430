//! Interpreter settings.
//!
//! Resolution order, first hit wins: command-line flags, `BF_MAX_STEPS`,
//! the `[interpreter]` section of `brainfuck.toml`, then built-in defaults.
//! The config file is looked up at `$BF_CONFIG`, or in the XDG config home.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cross_xdg::BaseDirs;

use crate::error::ConfigError;
use crate::interpreter::EofPolicy;
use crate::tape::{BoundsPolicy, DEFAULT_TAPE_SIZE};

pub const CONFIG_FILE_NAME: &str = "brainfuck.toml";
pub const CONFIG_PATH_ENV: &str = "BF_CONFIG";
pub const MAX_STEPS_ENV: &str = "BF_MAX_STEPS";

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub memsize: usize,
    pub eof: EofPolicy,
    pub bounds: BoundsPolicy,
    pub max_steps: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            memsize: DEFAULT_TAPE_SIZE,
            eof: EofPolicy::default(),
            bounds: BoundsPolicy::default(),
            max_steps: None,
        }
    }
}

/// A partial set of settings from one source (flags or config file).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub memsize: Option<usize>,
    pub eof: Option<EofPolicy>,
    pub bounds: Option<BoundsPolicy>,
    pub max_steps: Option<u64>,
}

impl Settings {
    /// Merge flags, the raw `BF_MAX_STEPS` value and config-file values over the defaults.
    pub fn resolve(flags: Overrides, env_max_steps: Option<&str>, file: Overrides) -> Self {
        let defaults = Settings::default();

        let env_max_steps = env_max_steps.and_then(|raw| match parse_step_limit(raw) {
            Ok(n) => Some(n),
            Err(e) => {
                log::warn!("ignoring {MAX_STEPS_ENV}: {e}");
                None
            }
        });

        Self {
            memsize: flags.memsize.or(file.memsize).unwrap_or(defaults.memsize),
            eof: flags.eof.or(file.eof).unwrap_or(defaults.eof),
            bounds: flags.bounds.or(file.bounds).unwrap_or(defaults.bounds),
            max_steps: flags.max_steps.or(env_max_steps).or(file.max_steps),
        }
    }
}

/// Parse a tape size. Zero, negatives and non-numbers are rejected.
pub fn parse_memsize(raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidMemorySize(raw.to_string())),
    }
}

pub fn parse_step_limit(raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidStepLimit(raw.to_string()))
}

/// Where the config file would be: `$BF_CONFIG` if set, else `<config home>/brainfuck.toml`.
pub fn config_path() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(explicit));
    }

    // Linux: /home/<user>/.config, macOS: /Users/<user>/.config,
    // Windows: C:\Users\<user>\.config
    let base_dirs = BaseDirs::new().ok()?;
    let mut path = PathBuf::from(base_dirs.config_home());
    path.push(CONFIG_FILE_NAME);
    Some(path)
}

/// Read overrides from the config file. A missing file yields no overrides.
pub fn load_file_overrides() -> Result<Overrides, ConfigError> {
    let Some(path) = config_path() else {
        return Ok(Overrides::default());
    };

    match fs::read_to_string(&path) {
        Ok(content) => {
            log::debug!("reading settings from {}", path.display());
            parse_config(&content, &path)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Overrides::default()),
        Err(source) => Err(ConfigError::ConfigRead { path, source }),
    }
}

/// Small line-based reader for the `[interpreter]` table.
///
/// Accepts `key = value` with optional double quotes and `#` comment lines.
/// Other tables are skipped; unknown keys inside `[interpreter]` are an error.
pub fn parse_config(content: &str, path: &Path) -> Result<Overrides, ConfigError> {
    let mut overrides = Overrides::default();
    let mut in_interpreter = false;

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            in_interpreter = line[1..line.len() - 1].trim() == "interpreter";
            continue;
        }
        if !in_interpreter {
            continue;
        }

        let fail = |message: String| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            line: idx + 1,
            message,
        };

        let Some((key, raw)) = line.split_once('=') else {
            return Err(fail(format!("expected `key = value`, found `{line}`")));
        };
        let key = key.trim();
        let raw = raw.trim();
        let value = raw
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(raw);

        let invalid = |e: ConfigError| fail(e.to_string());
        match key {
            "memsize" => overrides.memsize = Some(parse_memsize(value).map_err(invalid)?),
            "eof" => overrides.eof = Some(value.parse::<EofPolicy>().map_err(invalid)?),
            "bounds" => overrides.bounds = Some(value.parse::<BoundsPolicy>().map_err(invalid)?),
            "max_steps" => overrides.max_steps = Some(parse_step_limit(value).map_err(invalid)?),
            other => return Err(fail(format!("unknown key `{other}`"))),
        }
    }

    Ok(overrides)
}
