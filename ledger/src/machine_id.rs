//! Machine-identity reset.
//!
//! The desktop application keeps four telemetry identifiers in
//! `User/globalStorage/storage.json`. [`MachineIdResetter`] replaces exactly
//! those four keys with fresh random values and leaves every other key, and
//! the key order, untouched.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use crossterm::style::Stylize;
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;
use uuid::Uuid;

pub const DEV_DEVICE_ID: &str = "telemetry.devDeviceId";
pub const MAC_MACHINE_ID: &str = "telemetry.macMachineId";
pub const MACHINE_ID: &str = "telemetry.machineId";
pub const SQM_ID: &str = "telemetry.sqmId";

const APP_DIR: &str = "Cursor";
const STORAGE_FILE: [&str; 3] = ["User", "globalStorage", "storage.json"];

const INFO: &str = "ℹ️";
const FILE: &str = "📄";
const RESET: &str = "🔄";
const SUCCESS: &str = "✅";
const ERROR: &str = "❌";

#[derive(Error, Debug)]
pub enum MachineIdError {
    #[error("unsupported operating system: {0}")]
    UnsupportedPlatform(String),

    #[error("{0} is not set")]
    MissingEnv(&'static str),

    #[error("config file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("cannot read and write config file: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("config file is not a JSON object: {}", .0.display())]
    NotAnObject(PathBuf),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    /// Maps an OS name as reported by `std::env::consts::OS`.
    pub fn from_os(os: &str) -> Result<Self, MachineIdError> {
        match os {
            "windows" => Ok(Platform::Windows),
            "macos" => Ok(Platform::MacOs),
            "linux" => Ok(Platform::Linux),
            other => Err(MachineIdError::UnsupportedPlatform(other.to_string())),
        }
    }

    pub fn current() -> Result<Self, MachineIdError> {
        Self::from_os(std::env::consts::OS)
    }
}

/// Everything path resolution depends on, captured up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub platform: Platform,
    pub home_dir: PathBuf,
    /// `%APPDATA%`, required on Windows.
    pub app_data: Option<PathBuf>,
    /// `$XDG_CONFIG_HOME`, Linux falls back to `~/.config`.
    pub xdg_config_home: Option<PathBuf>,
}

impl IdentityConfig {
    pub fn from_env() -> Result<Self, MachineIdError> {
        let absolute = |var: &str| std::env::var_os(var).map(PathBuf::from).filter(|p| p.is_absolute());

        Ok(Self {
            platform: Platform::current()?,
            home_dir: dirs::home_dir().ok_or(MachineIdError::MissingEnv("HOME"))?,
            app_data: absolute("APPDATA"),
            xdg_config_home: absolute("XDG_CONFIG_HOME"),
        })
    }

    /// Absolute path of `storage.json` for this platform.
    pub fn storage_path(&self) -> Result<PathBuf, MachineIdError> {
        let base = match self.platform {
            Platform::Windows => self.app_data.clone().ok_or(MachineIdError::MissingEnv("APPDATA"))?,
            Platform::MacOs => self.home_dir.join("Library").join("Application Support"),
            Platform::Linux => self.xdg_config_home.clone().unwrap_or_else(|| self.home_dir.join(".config")),
        };

        let mut path = base.join(APP_DIR);
        path.extend(STORAGE_FILE);
        Ok(path)
    }
}

/// The four telemetry identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineIds {
    pub dev_device_id: String,
    pub machine_id: String,
    pub mac_machine_id: String,
    pub sqm_id: String,
}

impl MachineIds {
    pub fn entries(&self) -> [(&'static str, &str); 4] {
        [
            (DEV_DEVICE_ID, &self.dev_device_id),
            (MAC_MACHINE_ID, &self.mac_machine_id),
            (MACHINE_ID, &self.machine_id),
            (SQM_ID, &self.sqm_id),
        ]
    }

    /// Overwrites the four keys in `config`. Existing keys keep their position.
    pub fn apply(&self, config: &mut Map<String, Value>) {
        for (key, value) in self.entries() {
            config.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Fresh identifiers from the OS random source.
pub fn generate_new_ids() -> MachineIds {
    MachineIds {
        dev_device_id: Uuid::new_v4().to_string(),
        machine_id: format!("{:x}", Sha256::digest(random_bytes::<32>())),
        mac_machine_id: format!("{:x}", Sha512::digest(random_bytes::<64>())),
        sqm_id: format!("{{{}}}", Uuid::new_v4().to_string().to_uppercase()),
    }
}

/// Checks that `path` can be opened for both reading and writing, without
/// modifying it.
fn check_access(path: &Path) -> Result<(), MachineIdError> {
    let denied = || MachineIdError::PermissionDenied(path.to_path_buf());

    if fs::metadata(path)?.permissions().readonly() {
        return Err(denied());
    }
    match OpenOptions::new().read(true).write(true).open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Err(denied()),
        Err(e) => Err(e.into()),
    }
}

fn write_pretty(path: &Path, config: &Map<String, Value>) -> Result<(), MachineIdError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    config.serialize(&mut ser)?;
    fs::write(path, buf)?;
    Ok(())
}

/// Progress output is best effort; a closed stdout must not abort the reset.
fn say<W: Write>(out: &mut W, line: impl std::fmt::Display) {
    let _ = writeln!(out, "{}", line);
}

#[derive(Debug, Clone)]
pub struct MachineIdResetter {
    path: PathBuf,
}

impl MachineIdResetter {
    /// Resolves the storage path. Fails on an unsupported platform or a
    /// missing `APPDATA` on Windows.
    pub fn new(config: &IdentityConfig) -> Result<Self, MachineIdError> {
        Ok(Self { path: config.storage_path()? })
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the identifiers and returns the new ones.
    pub fn reset(&self) -> Result<MachineIds, MachineIdError> {
        self.run(&mut io::sink())
    }

    fn run<W: Write>(&self, out: &mut W) -> Result<MachineIds, MachineIdError> {
        say(out, format!("{} checking config file...", INFO).cyan());
        if !self.path.exists() {
            return Err(MachineIdError::MissingFile(self.path.clone()));
        }
        check_access(&self.path)?;

        say(out, format!("{} reading current config...", FILE).cyan());
        let raw = fs::read_to_string(&self.path)?;
        let mut config = match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => map,
            _ => return Err(MachineIdError::NotAnObject(self.path.clone())),
        };

        say(out, format!("{} generating new machine ids...", RESET).cyan());
        let ids = generate_new_ids();
        ids.apply(&mut config);

        say(out, format!("{} saving new config...", FILE).cyan());
        write_pretty(&self.path, &config)?;

        log::info!("machine ids reset in {}", self.path.display());
        Ok(ids)
    }

    /// Resets and reports every outcome to `out`. Returns `false` on any
    /// failure; nothing is raised.
    pub fn reset_machine_ids<W: Write>(&self, out: &mut W) -> bool {
        match self.run(out) {
            Ok(ids) => {
                say(out, format!("{} machine ids reset", SUCCESS).green());
                say(out, format!("\n{}", "new machine ids:".cyan()));
                for (key, value) in ids.entries() {
                    say(out, format!("{} {}: {}", INFO, key, value.green()));
                }
                true
            }
            Err(err) => {
                log::error!("machine id reset failed: {}", err);
                self.report_failure(out, &err);
                false
            }
        }
    }

    fn report_failure<W: Write>(&self, out: &mut W, err: &MachineIdError) {
        match err {
            MachineIdError::MissingFile(_) => say(out, format!("{} {}", ERROR, err).red()),
            MachineIdError::PermissionDenied(path) => {
                say(out, format!("{} cannot read or write the config file, check its permissions", ERROR).red());
                say(
                    out,
                    format!(
                        "{} if you changed the ids with go-cursor-help, make the file writable again: {}",
                        ERROR,
                        path.display()
                    )
                    .red(),
                );
            }
            MachineIdError::Io(io_err) if io_err.kind() == io::ErrorKind::PermissionDenied => {
                say(out, format!("{} permission error: {}", ERROR, io_err).red());
                say(out, format!("{} try running as administrator", INFO).yellow());
            }
            other => say(out, format!("{} reset failed: {}", ERROR, other).red()),
        }
    }
}
