use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// The user's own channel address (bare JID).
    pub jid: String,
    /// Optional log file; when unset, `BCCR_LOG_FILE` is consulted instead.
    pub log_file: Option<PathBuf>,
}

impl CoreConfig {
    pub fn new(jid: impl Into<String>) -> Self {
        Self {
            jid: jid.into(),
            log_file: None,
        }
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }
}
