/// When the invariant checker runs around public tree operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, derive_more::Display)]
pub enum CheckMode {
    /// Never run the checker implicitly.
    #[display("disabled")]
    Disabled,
    /// Run it only in builds with debug assertions enabled.
    #[default]
    #[display("debug-assertions")]
    DebugAssertions,
    #[display("always")]
    Always,
}

impl CheckMode {
    pub fn is_active(&self) -> bool {
        match self {
            CheckMode::Disabled => false,
            CheckMode::DebugAssertions => cfg!(debug_assertions),
            CheckMode::Always => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeOptions {
    pub check_mode: CheckMode,
    /// Upper bound on live nodes; inserts past it fail as allocation failures.
    pub node_limit: Option<usize>,
}

impl TreeOptions {
    pub fn with_check_mode(mut self, check_mode: CheckMode) -> Self {
        self.check_mode = check_mode;
        self
    }

    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = Some(limit);
        self
    }
}
