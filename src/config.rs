use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Parser, Debug, Clone)]
#[command(name = "launchpad")]
#[command(about = "Terminal launch-pad countdown (rocketlaunch.live + Open-Meteo)")]
pub(crate) struct Cli {
    /// Launch schedule refresh interval (minutes)
    #[arg(long)]
    pub(crate) launch_refresh_min: Option<u64>,

    /// Weather refresh interval (minutes)
    #[arg(long)]
    pub(crate) weather_refresh_min: Option<u64>,

    /// Force monochrome (no colors)
    #[arg(long, default_value_t = false)]
    pub(crate) mono: bool,

    /// Frame cap override
    #[arg(long)]
    pub(crate) fps: Option<u32>,

    /// RNG seed override (deterministic scene)
    #[arg(long)]
    pub(crate) seed: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Settings {
    pub(crate) fps_cap: u32,
    pub(crate) enable_color: bool,
    pub(crate) seed: u64,
    pub(crate) launch_refresh_min: u64,
    pub(crate) weather_refresh_min: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps_cap: 30,
            enable_color: true,
            seed: 0x0C0FFEE,
            launch_refresh_min: 10,
            weather_refresh_min: 20,
        }
    }
}

pub(crate) struct Paths {
    pub(crate) settings_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "launchpad", "Launchpad")
        .context("could not resolve project directories")?;
    let dir = proj.config_local_dir().to_path_buf();
    fs::create_dir_all(&dir).ok();
    Ok(Paths {
        settings_path: dir.join("settings.json"),
    })
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    if let Ok(s) = fs::read_to_string(path) {
        if let Ok(v) = serde_json::from_str::<Settings>(&s) {
            return v;
        }
    }
    Settings::default()
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data)?;
    if path.exists() {
        let _ = fs::remove_file(path);
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Saved settings with this run's CLI flags layered on top. Flags are not
/// written back; the file keeps the user's persistent choices.
pub(crate) fn effective_settings(saved: &Settings, cli: &Cli) -> Settings {
    let mut s = saved.clone();
    if let Some(fps) = cli.fps {
        s.fps_cap = fps.clamp(10, 120);
    }
    if cli.mono {
        s.enable_color = false;
    }
    if let Some(seed) = cli.seed {
        s.seed = seed;
    }
    if let Some(m) = cli.launch_refresh_min {
        s.launch_refresh_min = m.max(1);
    }
    if let Some(m) = cli.weather_refresh_min {
        s.weather_refresh_min = m.max(1);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_do_not_leak_defaults() {
        let saved = Settings {
            fps_cap: 60,
            enable_color: true,
            seed: 42,
            launch_refresh_min: 5,
            weather_refresh_min: 30,
        };
        let cli = Cli {
            launch_refresh_min: None,
            weather_refresh_min: Some(0),
            mono: true,
            fps: Some(500),
            seed: None,
        };
        let s = effective_settings(&saved, &cli);
        assert_eq!(s.fps_cap, 120); // clamped
        assert!(!s.enable_color);
        assert_eq!(s.seed, 42);
        assert_eq!(s.launch_refresh_min, 5);
        assert_eq!(s.weather_refresh_min, 1); // floor of one minute
    }

    #[test]
    fn settings_round_trip() {
        let s = Settings::default();
        let json = serde_json::to_string(&s).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.fps_cap, s.fps_cap);
        assert_eq!(back.seed, s.seed);
    }
}
