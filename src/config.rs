//! Ambient configuration (spec §6).

/// Process-wide knobs a host can set before wiring up dispatchers. There is
/// no file or CLI surface here — `plum` is a library, not a standalone tool
/// (spec §1's scope), so configuration is a plain builder the embedding
/// application fills in from whatever source it already uses.
#[derive(Debug, Clone)]
pub struct PlumConfig {
    /// Emit a `tracing::warn!` when a registration replaces an existing
    /// method with an equal signature. Enabled by default, matching the
    /// upstream `MethodRedefinitionWarning`.
    pub warn_on_redefinition: bool,
    /// Cap on how many near-miss candidates a `NotFound` error suggests
    /// (spec §7). The upstream caps this at 3.
    pub max_suggestions: usize,
}

impl Default for PlumConfig {
    fn default() -> Self {
        PlumConfig {
            warn_on_redefinition: true,
            max_suggestions: 3,
        }
    }
}

impl PlumConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_warn_on_redefinition(mut self, warn: bool) -> Self {
        self.warn_on_redefinition = warn;
        self
    }

    pub fn with_max_suggestions(mut self, max: usize) -> Self {
        self.max_suggestions = max;
        self
    }
}
