use crate::store::StoreError;
use std::fmt;
use thiserror::Error as ThisError;

///
/// ERROR_TABLE_VERSION
///
/// Bumped whenever a code is added, removed, or re-templated.
/// Codes are never reused across versions.
///

pub const ERROR_TABLE_VERSION: u32 = 1;

///
/// Error
///
/// Boundary error for every public operation.
/// Carries a stable numeric code and, for store failures, the collaborator
/// error as its source.
///

#[derive(Debug, ThisError)]
#[error("{code}: {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a collaborator failure under the code of the step that hit it.
    #[must_use]
    pub fn store(code: ErrorCode, err: StoreError) -> Self {
        Self {
            code,
            message: code.template().to_string(),
            source: Some(Box::new(err)),
        }
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        self.code.class()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.code.class().is_retryable()
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.class(), self.code, self.message)
    }
}

///
/// ErrorClass
///
/// Coarse category callers match on to pick retry vs abort.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorClass {
    Schema,
    Serialize,
    Encode,
    Diff,
    Store,
    Query,
    Usage,
}

impl ErrorClass {
    /// Only collaborator failures can succeed on a second attempt.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Store)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Schema => "schema",
            Self::Serialize => "serialize",
            Self::Encode => "encode",
            Self::Diff => "diff",
            Self::Store => "store",
            Self::Query => "query",
            Self::Usage => "usage",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorCode
///
/// Stable numeric error table. The thousands digit is the class.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u16)]
pub enum ErrorCode {
    // schema
    SchemaNameMissing = 1001,
    SchemaPrimaryMissing = 1002,
    SchemaPrimaryDuplicate = 1003,
    SchemaUnsupportedKind = 1004,
    SchemaDuplicateField = 1005,
    SchemaReservedName = 1006,
    PrimaryKeyInvalid = 1007,

    // serialize
    Serialize = 2001,
    Deserialize = 2002,
    DeserializeSizeLimitExceeded = 2003,

    // structural encoding
    EncodeDepthMismatch = 3001,
    EncodeKindMismatch = 3002,
    EncodeIntegerOverflow = 3003,
    EncodeUnsupportedValue = 3004,
    EncodeCorruptKey = 3005,
    EncodeSentinelText = 3006,

    // diff
    DiffUnsupportedKind = 4001,
    DiffSliceMismatch = 4002,
    DiffMapMismatch = 4003,
    DiffScalarMismatch = 4004,
    DiffNoEffectiveChange = 4005,

    // store
    CreatePut = 5001,
    ReadGet = 5002,
    UpdateGet = 5003,
    UpdateDelete = 5004,
    UpdatePut = 5005,
    DeleteGet = 5006,
    DeleteDelete = 5007,
    CompactScan = 5008,
    CompactGet = 5009,
    CompactPut = 5010,
    CompactDelete = 5011,
    InsertGet = 5012,

    // query
    QuerySyntax = 6001,
    QueryUnknownOperator = 6002,
    QueryUnknownField = 6003,
    QueryPathOverflow = 6004,
    QueryPathStep = 6005,
    QueryParseBool = 6006,
    QueryParseInt = 6007,
    QueryParseUint = 6008,
    QueryParseFloat = 6009,
    QueryScan = 6010,
    QueryIterate = 6011,
    QueryRead = 6012,

    // usage
    TypeMismatch = 7001,
    AlreadyExists = 7002,
    NotRegistered = 7003,
    AlreadyRegistered = 7004,
    InvalidOptions = 7005,
}

impl ErrorCode {
    pub const ALL: &'static [Self] = &[
        Self::SchemaNameMissing,
        Self::SchemaPrimaryMissing,
        Self::SchemaPrimaryDuplicate,
        Self::SchemaUnsupportedKind,
        Self::SchemaDuplicateField,
        Self::SchemaReservedName,
        Self::PrimaryKeyInvalid,
        Self::Serialize,
        Self::Deserialize,
        Self::DeserializeSizeLimitExceeded,
        Self::EncodeDepthMismatch,
        Self::EncodeKindMismatch,
        Self::EncodeIntegerOverflow,
        Self::EncodeUnsupportedValue,
        Self::EncodeCorruptKey,
        Self::EncodeSentinelText,
        Self::DiffUnsupportedKind,
        Self::DiffSliceMismatch,
        Self::DiffMapMismatch,
        Self::DiffScalarMismatch,
        Self::DiffNoEffectiveChange,
        Self::CreatePut,
        Self::ReadGet,
        Self::UpdateGet,
        Self::UpdateDelete,
        Self::UpdatePut,
        Self::DeleteGet,
        Self::DeleteDelete,
        Self::CompactScan,
        Self::CompactGet,
        Self::CompactPut,
        Self::CompactDelete,
        Self::InsertGet,
        Self::QuerySyntax,
        Self::QueryUnknownOperator,
        Self::QueryUnknownField,
        Self::QueryPathOverflow,
        Self::QueryPathStep,
        Self::QueryParseBool,
        Self::QueryParseInt,
        Self::QueryParseUint,
        Self::QueryParseFloat,
        Self::QueryScan,
        Self::QueryIterate,
        Self::QueryRead,
        Self::TypeMismatch,
        Self::AlreadyExists,
        Self::NotRegistered,
        Self::AlreadyRegistered,
        Self::InvalidOptions,
    ];

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    #[must_use]
    pub fn from_u16(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_u16() == code)
    }

    #[must_use]
    pub const fn class(self) -> ErrorClass {
        match self.as_u16() / 1000 {
            1 => ErrorClass::Schema,
            2 => ErrorClass::Serialize,
            3 => ErrorClass::Encode,
            4 => ErrorClass::Diff,
            5 => ErrorClass::Store,
            6 => ErrorClass::Query,
            _ => ErrorClass::Usage,
        }
    }

    /// Human-readable template for the code.
    #[must_use]
    pub const fn template(self) -> &'static str {
        match self {
            Self::SchemaNameMissing => "name tag missing for field",
            Self::SchemaPrimaryMissing => "primary field missing/empty",
            Self::SchemaPrimaryDuplicate => "more than one primary field",
            Self::SchemaUnsupportedKind => "unsupported kind",
            Self::SchemaDuplicateField => "duplicate field name",
            Self::SchemaReservedName => "name contains reserved characters",
            Self::PrimaryKeyInvalid => "primary key value is empty or invalid",
            Self::Serialize => "document serialization failed",
            Self::Deserialize => "document deserialization failed",
            Self::DeserializeSizeLimitExceeded => "document exceeds size limit",
            Self::EncodeDepthMismatch => "traversal depth not found in depth-kind map",
            Self::EncodeKindMismatch => "value kind does not match the schema",
            Self::EncodeIntegerOverflow => "integer overflow",
            Self::EncodeUnsupportedValue => "unsupported value",
            Self::EncodeCorruptKey => "index key could not be decoded",
            Self::EncodeSentinelText => "text contains the scan sentinel U+10FFFF",
            Self::DiffUnsupportedKind => "find difference: unsupported kind",
            Self::DiffSliceMismatch => "find slice difference: source and target kinds differ",
            Self::DiffMapMismatch => "find map difference: source and target kinds differ",
            Self::DiffScalarMismatch => "find difference: scalar kinds differ",
            Self::DiffNoEffectiveChange => "update: found no change",
            Self::CreatePut => "create: put failed",
            Self::ReadGet => "read: get failed",
            Self::UpdateGet => "update: get failed",
            Self::UpdateDelete => "update: delete failed",
            Self::UpdatePut => "update: put failed",
            Self::DeleteGet => "delete: get failed",
            Self::DeleteDelete => "delete: delete failed",
            Self::CompactScan => "compact: range scan failed",
            Self::CompactGet => "compact: get failed",
            Self::CompactPut => "compact: put failed",
            Self::CompactDelete => "compact: delete failed",
            Self::InsertGet => "insert: get failed",
            Self::QuerySyntax => "query: syntax error",
            Self::QueryUnknownOperator => "query: unknown operator",
            Self::QueryUnknownField => "query: field not found",
            Self::QueryPathOverflow => "query: path deeper than the field",
            Self::QueryPathStep => "query: invalid path step",
            Self::QueryParseBool => "query: bool literal parse error",
            Self::QueryParseInt => "query: int literal parse error",
            Self::QueryParseUint => "query: uint literal parse error",
            Self::QueryParseFloat => "query: float literal parse error",
            Self::QueryScan => "query: range scan failed",
            Self::QueryIterate => "query: range iteration failed",
            Self::QueryRead => "query: get failed",
            Self::TypeMismatch => "document type mismatch",
            Self::AlreadyExists => "document already exists",
            Self::NotRegistered => "document type not registered",
            Self::AlreadyRegistered => "document type already registered",
            Self::InvalidOptions => "invalid options",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

///
/// TESTS
///
