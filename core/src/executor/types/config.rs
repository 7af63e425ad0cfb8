use std::path::PathBuf;

/// How runner progress is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressMode {
    /// One JSON record per engine event or output line.
    Structured,
    #[default]
    Plain,
}

impl ProgressMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Structured
        } else {
            Self::Plain
        }
    }
}

/// Options for one run of the stage executor.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOpts {
    /// Org qualifier prepended to stack names (`org/stack`).
    pub org: Option<String>,

    /// Root that project working directories are resolved against.
    pub source_root: PathBuf,

    pub progress_mode: ProgressMode,

    /// Stop after the first stage that had a failure instead of running the
    /// remaining stages.
    pub stop_on_failure: bool,

    /// Enable visual progress bars (ignored in structured mode)
    pub progress_bar: bool,
}

impl ExecutionOpts {
    pub fn org(&self) -> Option<&str> {
        self.org.as_deref().map(str::trim).filter(|o| !o.is_empty())
    }
}
