use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::XvmError;
use crate::scope::{self, GLOBAL_SCOPE_VAR, HOME_VAR};

const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Debug)]
pub struct Config {
    pub global_root: PathBuf,
    pub config_path: PathBuf,
    pub editor: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    editor: Option<String>,
}

#[derive(Clone, Debug, Default)]
struct EnvConfig {
    global_root: Option<OsString>,
    home: Option<PathBuf>,
    editor: Option<String>,
}

pub fn load() -> Result<Config, XvmError> {
    let env = env_config();
    let global_root = scope::global_root(env.global_root.clone(), env.home.clone())?;
    let config_path = global_root.join(CONFIG_FILE);
    let file = load_partial_if_exists(&config_path)?;

    Ok(merge_config(global_root, config_path, file, env))
}

fn env_config() -> EnvConfig {
    EnvConfig {
        global_root: std::env::var_os(GLOBAL_SCOPE_VAR),
        home: std::env::var_os(HOME_VAR)
            .map(PathBuf::from)
            .or_else(dirs::home_dir),
        editor: std::env::var("EDITOR").ok(),
    }
}

fn load_partial_if_exists(path: &Path) -> Result<PartialConfig, XvmError> {
    if !path.exists() {
        return Ok(PartialConfig::default());
    }

    let raw = std::fs::read_to_string(path).map_err(|source| XvmError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&raw).map_err(|source| XvmError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

fn merge_config(
    global_root: PathBuf,
    config_path: PathBuf,
    file: PartialConfig,
    env: EnvConfig,
) -> Config {
    let editor = env
        .editor
        .or(file.editor)
        .filter(|editor| !editor.trim().is_empty());

    Config {
        global_root,
        config_path,
        editor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merged(file_editor: Option<&str>, env_editor: Option<&str>) -> Config {
        let file = PartialConfig {
            editor: file_editor.map(str::to_string),
        };
        let env = EnvConfig {
            editor: env_editor.map(str::to_string),
            ..EnvConfig::default()
        };
        merge_config(
            PathBuf::from("/home/u/.xvm"),
            PathBuf::from("/home/u/.xvm/config.toml"),
            file,
            env,
        )
    }

    #[test]
    fn env_editor_overrides_file() {
        let cfg = merged(Some("nano"), Some("vim"));
        assert_eq!(cfg.editor.as_deref(), Some("vim"));
    }

    #[test]
    fn file_editor_used_without_env() {
        let cfg = merged(Some("nano"), None);
        assert_eq!(cfg.editor.as_deref(), Some("nano"));
    }

    #[test]
    fn blank_editor_is_unset() {
        let cfg = merged(None, Some("  "));
        assert!(cfg.editor.is_none());
    }

    #[test]
    fn invalid_config_file_fails_with_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        std::fs::write(&path, "editor = [").expect("write config");

        let err = load_partial_if_exists(&path).expect_err("should fail");
        assert!(matches!(err, XvmError::ConfigParse { path: ref p, .. } if p == &path));
    }

    #[test]
    fn missing_config_file_is_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let partial = load_partial_if_exists(&temp.path().join(CONFIG_FILE)).expect("load");
        assert!(partial.editor.is_none());
    }
}
