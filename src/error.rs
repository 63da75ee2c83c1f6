use thiserror::Error;

/// Failures opening or decrypting the credential archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("archive cannot be read as a ZIP container: {0}")]
    Corrupt(String),

    #[error("archive password is incorrect")]
    WrongPassword,
}

/// Failures decoding the KYC XML document.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed XML document: {0}")]
    Malformed(String),
}

impl From<quick_xml::Error> for ParseError {
    fn from(e: quick_xml::Error) -> Self {
        ParseError::Malformed(e.to_string())
    }
}

/// Failures checking the user-supplied identifier against the record.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("identifier must be exactly 12 digits")]
    WrongLength,

    #[error("identifier does not match the reference fragment of the loaded record")]
    SuffixMismatch,
}

/// Umbrella error surfaced by the pipeline coordinator. Each stage failure
/// maps to a single user-facing message; no stage is retried automatically.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no XML member found in the extracted archive")]
    NoXmlMember,

    #[error("XML document contains no KYC payload")]
    MissingRecord,

    #[error("storage failure: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
