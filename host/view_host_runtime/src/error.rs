use thiserror::Error;

/// Why a patch path did not lead to a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("invalid escape ~{0} in path step")]
    InvalidEscape(char),

    #[error("trailing ~ in path step")]
    TrailingEscape,

    #[error("unknown node field '{step}' at {path}")]
    UnknownField { step: String, path: String },

    #[error("expected child index after 'children', got '{step}' at {path}")]
    InvalidIndex { step: String, path: String },

    #[error("child index {index} out of bounds at {path}")]
    IndexOutOfBounds { index: usize, path: String },

    #[error("child {index} is text, not a node, at {path}")]
    TextChild { index: usize, path: String },

    #[error("path ends inside the children list: {path}")]
    Incomplete { path: String },
}

/// Reasons a layout update was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("path resolution failed: {0}")]
    Path(#[from] PathError),

    #[error("no live render instance for node at '{path}'")]
    NoHandler { path: String },
}

/// External component resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("no external component registered under '{0}'")]
    NotFound(String),

    #[error("unsupported external source '{0}'")]
    Unsupported(String),

    #[error("external component load failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}
