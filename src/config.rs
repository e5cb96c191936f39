use crate::logging::LogLevel;
use crate::model::{Pantry, Rules};
use crate::sim::{DecayInterval, SessionConfig};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

/// `petconsole`: a virtual pet that lives in your terminal
#[derive(Parser, Debug, Default)]
#[command(name = "petconsole", version, about = "A virtual pet that lives in your terminal")]
pub struct Cli {
    /// Settings file to use instead of the one in the data directory
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Name of the pet
    #[arg(long)]
    pub name: Option<String>,

    /// Random seed; 0 picks one from the clock
    #[arg(long)]
    pub seed: Option<u64>,

    /// Seconds between need decay steps
    #[arg(long)]
    pub decay_interval: Option<f64>,

    /// Frame rate cap
    #[arg(long)]
    pub fps: Option<u32>,

    /// Draw without colours
    #[arg(long)]
    pub no_color: bool,

    /// Logging verbosity level
    #[arg(long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pet_name: String,
    pub species: String,
    pub fps_cap: u32,
    pub enable_color: bool,
    pub seed: u64,
    pub decay_interval_secs: f64,
    pub max_log_lines: usize,
    pub pantry: Pantry,
    pub rules: Rules,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pet_name: "Hong Lu".to_string(),
            species: "Dragon".to_string(),
            fps_cap: 30,
            enable_color: true,
            seed: 0,
            decay_interval_secs: DecayInterval::DEFAULT.secs(),
            max_log_lines: 200,
            pantry: Pantry::default(),
            rules: Rules::default(),
        }
    }
}

impl Settings {
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(name) = &cli.name {
            self.pet_name = name.clone();
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if let Some(secs) = cli.decay_interval {
            self.decay_interval_secs = secs;
        }
        if let Some(fps) = cli.fps {
            self.fps_cap = fps;
        }
        if cli.no_color {
            self.enable_color = false;
        }
    }

    pub fn session_config(&self) -> Result<SessionConfig> {
        let decay_interval = DecayInterval::new(self.decay_interval_secs)
            .with_context(|| format!("invalid decay interval {}", self.decay_interval_secs))?;
        if self.rules.max_catchup_steps == 0 {
            bail!("rules.max_catchup_steps must be at least 1");
        }
        Ok(SessionConfig {
            pet_name: self.pet_name.clone(),
            species: self.species.clone(),
            decay_interval,
            rules: self.rules.clone(),
            pantry: self.pantry.clone(),
        })
    }

    /// The configured seed, or one taken from `now` when it is 0.
    pub fn resolve_seed(&self, now: DateTime<Utc>) -> u64 {
        if self.seed != 0 {
            self.seed
        } else {
            now.timestamp_millis() as u64
        }
    }
}

pub struct Paths {
    pub settings_path: PathBuf,
    pub log_path: PathBuf,
}

pub fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "petconsole", "PetConsole")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir)
        .with_context(|| format!("could not create {}", dir.display()))?;
    Ok(Paths {
        settings_path: dir.join("settings.json"),
        log_path: dir.join("petconsole.log"),
    })
}

/// Reads settings, falling back to defaults when the file is unreadable.
/// A missing file is created with the defaults so there is something to edit.
pub fn load_settings(path: &Path) -> Result<Settings> {
    match fs::read_to_string(path) {
        Ok(s) => match serde_json::from_str::<Settings>(&s) {
            Ok(v) => Ok(v),
            Err(err) => {
                warn!(%err, path = %path.display(), "ignoring malformed settings");
                Ok(Settings::default())
            }
        },
        Err(_) if !path.exists() => {
            let settings = Settings::default();
            save_settings_atomic(path, &settings)?;
            Ok(settings)
        }
        Err(err) => {
            warn!(%err, path = %path.display(), "could not read settings");
            Ok(Settings::default())
        }
    }
}

pub fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data).with_context(|| format!("could not write {}", tmp.display()))?;
    if path.exists() {
        let _ = fs::remove_file(path);
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
