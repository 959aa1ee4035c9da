use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use serde::Deserialize;
use tracing::{
  debug,
  info
};

const CONFIG_ENV: &str = "AGENDA_CONFIG";
const APP_DIR: &str = "agenda";
const CONFIG_FILE: &str = "agenda.toml";

/// Settings for the host program. Everything the user edits in the app
/// lives in the profile record instead.
#[derive(
  Debug, Clone, Default, Deserialize,
)]
#[serde(default, deny_unknown_fields)]
pub struct AgendaConfig {
  pub data_dir:    Option<PathBuf>,
  pub color:       Option<bool>,
  #[serde(skip)]
  pub loaded_from: Option<PathBuf>
}

impl AgendaConfig {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) = resolve_config_path(
      config_override
    )?
    else {
      debug!(
        "no config file found; using \
         defaults"
      );
      return Ok(Self::default());
    };

    info!(config = %path.display(), "loading config");
    let mut cfg = Self::from_file(&path)?;
    cfg.loaded_from = Some(path);
    Ok(cfg)
  }

  pub fn from_file(
    path: &Path
  ) -> anyhow::Result<Self> {
    let path = expand_tilde(path);
    let raw = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed reading {}",
          path.display()
        )
      })?;
    Self::parse(&raw).with_context(|| {
      format!(
        "failed parsing {}",
        path.display()
      )
    })
  }

  pub fn parse(
    raw: &str
  ) -> anyhow::Result<Self> {
    Ok(toml::from_str::<Self>(raw)?)
  }

  /// Color output unless the config turns it off.
  pub fn color_enabled(&self) -> bool {
    self.color.unwrap_or(true)
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &AgendaConfig,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    expand_tilde(path)
  } else if let Some(path) =
    cfg.data_dir.as_deref()
  {
    expand_tilde(path)
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV)
    && !raw.trim().is_empty()
  {
    return Ok(Some(PathBuf::from(raw)));
  }

  let Some(config_dir) =
    dirs::config_dir()
  else {
    return Ok(None);
  };
  let candidate = config_dir
    .join(APP_DIR)
    .join(CONFIG_FILE);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  if let Some(dir) = dirs::data_dir() {
    return Ok(dir.join(APP_DIR));
  }
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(".agenda"))
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}
