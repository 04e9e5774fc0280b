// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Closed set of error kinds raised by the storage core.
///
/// The core never panics on bad caller input or bad on-disk data; every
/// fallible entry point returns one of these instead.
#[derive(Debug)]
pub enum Error {
    /// Contract violation by the caller (division by zero, re-setting an
    /// id that is already assigned, calling an operation out of order).
    LogicError(String),

    /// A numeric or index argument fell outside its allowed domain.
    OutOfRange(String),

    /// A public-API argument failed a validity check.
    InvalidParameter(String),

    /// A number could not be parsed or is not representable.
    InvalidNumber(String),

    /// A token in a textual grammar (base introducer, escape, ...) is invalid.
    InvalidToken(String),

    /// A size value is invalid for its context.
    InvalidSize(String),

    /// A type tag does not match what was expected.
    InvalidType(String),

    /// An entity (row, column, index, schema) is not well-formed.
    InvalidEntity(String),

    /// A name fails naming rules (identifier syntax, reserved word, ...).
    InvalidName(String),

    /// A file that was expected to exist does not.
    FileNotFound(String),

    /// An operation was attempted on a file that isn't open.
    FileNotOpened(String),

    /// A file could not be removed/replaced because it is still in use.
    FileStillInUse(String),

    /// A block or record failed a structural/magic/checksum check.
    CorruptedData(String),

    /// A block reference does not resolve to an allocated block.
    BlockNotFound(u64),

    /// A page offset does not resolve within the file.
    PageNotFound(u64),

    /// No row matches the requested key.
    RowNotFound,

    /// No column with the requested id/name exists in the schema.
    ColumnNotFound(String),

    /// No schema is stored at the requested version/reference.
    SchemaNotFound,

    /// No field with the requested name exists in a block's structure.
    FieldNotFound(String),

    /// No block type matches a requested magic.
    TypeNotFound([u8; 4]),

    /// Insertion of a row whose primary key already exists.
    RowAlreadyExists,

    /// An id (OID, language id, ...) is already assigned.
    IdAlreadyAssigned(u64),

    /// A key was defined twice in a context that requires uniqueness.
    DefinedTwice(String),

    /// A node is already present in a tree-shaped index.
    NodeAlreadyInTree,

    /// A fixed-capacity container (e.g. the 255-slot attachment table) is full.
    Full,

    /// Underlying filesystem operation failed.
    IoError(std::io::Error),

    /// End of input reached where more data was expected.
    UnexpectedEof,

    /// An unexpected token was encountered while parsing.
    UnexpectedToken(String),

    /// A required parameter/section/key is missing.
    MissingParameter(String),

    /// An unknown parameter/section/key was supplied.
    UnknownParameter(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LogicError(msg) => write!(f, "logic error: {msg}"),
            Self::OutOfRange(msg) => write!(f, "out of range: {msg}"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::InvalidNumber(msg) => write!(f, "invalid number: {msg}"),
            Self::InvalidToken(msg) => write!(f, "invalid token: {msg}"),
            Self::InvalidSize(msg) => write!(f, "invalid size: {msg}"),
            Self::InvalidType(msg) => write!(f, "invalid type: {msg}"),
            Self::InvalidEntity(msg) => write!(f, "invalid entity: {msg}"),
            Self::InvalidName(msg) => write!(f, "invalid name: {msg}"),
            Self::FileNotFound(path) => write!(f, "file not found: {path}"),
            Self::FileNotOpened(path) => write!(f, "file not opened: {path}"),
            Self::FileStillInUse(path) => write!(f, "file still in use: {path}"),
            Self::CorruptedData(msg) => write!(f, "corrupted data: {msg}"),
            Self::BlockNotFound(r) => write!(f, "block not found at reference {r}"),
            Self::PageNotFound(r) => write!(f, "page not found at offset {r}"),
            Self::RowNotFound => write!(f, "row not found"),
            Self::ColumnNotFound(name) => write!(f, "column not found: {name}"),
            Self::SchemaNotFound => write!(f, "schema not found"),
            Self::FieldNotFound(name) => write!(f, "field not found: {name}"),
            Self::TypeNotFound(magic) => {
                write!(f, "unknown block type magic: {:?}", String::from_utf8_lossy(magic))
            }
            Self::RowAlreadyExists => write!(f, "row already exists"),
            Self::IdAlreadyAssigned(id) => write!(f, "id already assigned: {id}"),
            Self::DefinedTwice(name) => write!(f, "defined twice: {name}"),
            Self::NodeAlreadyInTree => write!(f, "node already in tree"),
            Self::Full => write!(f, "container is full"),
            Self::IoError(e) => write!(f, "I/O error: {e}"),
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::UnexpectedToken(tok) => write!(f, "unexpected token: {tok}"),
            Self::MissingParameter(name) => write!(f, "missing parameter: {name}"),
            Self::UnknownParameter(name) => write!(f, "unknown parameter: {name}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}

/// Storage-core result alias.
pub type Result<T> = std::result::Result<T, Error>;
