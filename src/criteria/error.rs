use thiserror::Error;

/// Which lookup table a reference failed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Hero,
    HeroTag,
    Script,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::HeroTag => "hero tag",
            Self::Script => "script",
        }
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal parse failures. Line numbers are 1-based positions in the raw dump.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CriteriaError {
    #[error("[{record_id}] criteria text is empty")]
    EmptyInput { record_id: String },

    #[error("[{record_id}] line {line_number}: malformed nested header '{line}'")]
    MalformedNested {
        record_id: String,
        line_number: usize,
        line: String,
    },

    #[error("[{record_id}] line {line_number}: group needs {needed} of {total}: '{line}'")]
    NeededExceedsTotal {
        record_id: String,
        line_number: usize,
        line: String,
        needed: usize,
        total: usize,
    },

    #[error(
        "[{record_id}] line {line_number}: group declares {declared} children but {found} were indented under it: '{line}'"
    )]
    ChildCountMismatch {
        record_id: String,
        line_number: usize,
        line: String,
        declared: usize,
        found: usize,
    },

    #[error("[{record_id}] line {line_number}: groups nested deeper than {limit}: '{line}'")]
    NestingTooDeep {
        record_id: String,
        line_number: usize,
        line: String,
        limit: usize,
    },

    #[error("[{record_id}] line {line_number}: unconsumed trailing line '{line}'")]
    TrailingLines {
        record_id: String,
        line_number: usize,
        line: String,
    },

    #[error("[{record_id}] line {line_number}: unresolved {kind} '{name}' in '{line}'")]
    UnresolvedReference {
        record_id: String,
        line_number: usize,
        line: String,
        kind: ReferenceKind,
        name: String,
    },
}

impl CriteriaError {
    /// Structural errors mean the indentation grammar no longer matches the dump.
    pub fn is_structural(&self) -> bool {
        !matches!(self, CriteriaError::UnresolvedReference { .. })
    }
}

#[derive(Debug, Error)]
pub enum TablesError {
    #[error("unable to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse yaml '{path}': {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("unable to parse json '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
