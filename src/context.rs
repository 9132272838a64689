use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::Config;
use crate::scope::{self, Scope, ScopeKind};
use crate::snapshot::Snapshot;

/// State resolved once per invocation and handed to every command.
#[derive(Debug)]
pub struct Context {
    /// `None` when the working directory no longer exists.
    pub cwd: Option<PathBuf>,
    pub config: Config,
    pub global: Scope,
    /// Nearest scope to `cwd`; equal to `global` when there is none.
    pub local: Scope,
    pub snapshot: Snapshot,
}

impl Context {
    pub fn load(config: Config) -> anyhow::Result<Self> {
        let cwd = match std::env::current_dir() {
            Ok(cwd) => Some(cwd),
            Err(err) => {
                warn!(error = %err, "failed to get working directory; using the global scope");
                None
            }
        };
        Self::load_from(config, cwd)
    }

    pub fn load_from(config: Config, cwd: Option<PathBuf>) -> anyhow::Result<Self> {
        let global = Scope::global(config.global_root.clone());
        let local = scope::resolve_local(&global, cwd.as_deref());
        debug!(
            global_scope = %global.path.display(),
            local_scope = %local.path.display(),
            "resolved scopes"
        );

        let snapshot = Snapshot::load(&global, &local)?;

        Ok(Self {
            cwd,
            config,
            global,
            local,
            snapshot,
        })
    }

    pub fn global_root(&self) -> &Path {
        &self.global.path
    }

    /// The scope a command reads or writes: the named one, or the nearest.
    pub fn scope(&self, kind: Option<ScopeKind>) -> &Scope {
        match kind {
            Some(ScopeKind::Global) => &self.global,
            Some(ScopeKind::Local) | None => &self.local,
        }
    }
}
