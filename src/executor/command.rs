use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// What a detected command asks for.
///
/// Serialized in kebab-case. Any unrecognized kind string is preserved as
/// `Unknown` so the dispatcher can reject it explicitly instead of failing
/// at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CommandKind {
    MakeDirectory,
    MakeFile,
    TerminalBlock,
    TerminalLine,
    PythonScript,
    Unknown(String),
}

impl CommandKind {
    pub fn as_str(&self) -> &str {
        match self {
            CommandKind::MakeDirectory => "make-directory",
            CommandKind::MakeFile => "make-file",
            CommandKind::TerminalBlock => "terminal-block",
            CommandKind::TerminalLine => "terminal-line",
            CommandKind::PythonScript => "python-script",
            CommandKind::Unknown(kind) => kind,
        }
    }

    /// Kinds whose payload is a workspace-relative path.
    pub fn is_filesystem(&self) -> bool {
        matches!(self, CommandKind::MakeDirectory | CommandKind::MakeFile)
    }

    /// Kinds whose payload is a command body handed to a process.
    pub fn is_process(&self) -> bool {
        matches!(
            self,
            CommandKind::TerminalBlock | CommandKind::TerminalLine | CommandKind::PythonScript
        )
    }
}

impl From<&str> for CommandKind {
    fn from(s: &str) -> Self {
        match s {
            "make-directory" => CommandKind::MakeDirectory,
            "make-file" => CommandKind::MakeFile,
            "terminal-block" => CommandKind::TerminalBlock,
            "terminal-line" => CommandKind::TerminalLine,
            "python-script" => CommandKind::PythonScript,
            other => CommandKind::Unknown(other.to_string()),
        }
    }
}

impl From<String> for CommandKind {
    fn from(s: String) -> Self {
        CommandKind::from(s.as_str())
    }
}

impl From<CommandKind> for String {
    fn from(kind: CommandKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected intent, prior to execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub kind: CommandKind,

    /// Relative path for filesystem kinds, command body for process kinds.
    pub payload: String,

    /// The exact source span that produced this descriptor.
    pub original: String,

    /// Byte range of `original` within the scanned text.
    #[serde(default)]
    pub span: Range<usize>,
}

impl CommandDescriptor {
    /// Build a descriptor that did not come from detection.
    pub fn new(
        kind: impl Into<CommandKind>,
        payload: impl Into<String>,
        original: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
            original: original.into(),
            span: 0..0,
        }
    }
}
