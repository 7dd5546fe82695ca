//! Scheduler options

use crate::incremental::BuildConfig;

/// What happens to completed-but-unpublished work when a newer edit
/// supersedes a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupersedePolicy {
    /// Discard everything since the last publish and re-apply all pending
    /// edits to the published tree.
    Restart,
    /// Keep the results of edits whose build completed and re-run only the
    /// interrupted one.
    #[default]
    Resume,
}

/// Options for a synchronization engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Options passed to every build
    pub build: BuildConfig,
    /// Handling of superseded builds
    pub supersede: SupersedePolicy,
    /// Name of the worker thread
    pub thread_name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            build: BuildConfig::default(),
            supersede: SupersedePolicy::default(),
            thread_name: "treesync-worker".to_string(),
        }
    }
}

impl SyncConfig {
    pub fn with_build(mut self, build: BuildConfig) -> Self {
        self.build = build;
        self
    }

    pub fn with_supersede(mut self, supersede: SupersedePolicy) -> Self {
        self.supersede = supersede;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}
