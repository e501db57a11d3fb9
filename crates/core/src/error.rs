use crate::types::UserId;
use crate::validation::FieldViolation;

/// Coarse classification of a [`CoreError`].
///
/// Transport layers translate the kind into a status code; the variant's
/// [`code`](CoreError::code) tells the client exactly what happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unauthorized,
    ResourceLimit,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed with {} violation(s)", .0.len())]
    Validation(Vec<FieldViolation>),

    #[error("User with id {0} does not exist")]
    UserNotFound(UserId),

    #[error("No session matched the given id and token")]
    NoSessionsFound,

    #[error("This email has already been used")]
    DuplicateEmail,

    #[error("This username is already in use")]
    DuplicateUsername,

    #[error("Cannot create a relationship with yourself")]
    SameUser,

    #[error("Relationship already exists")]
    RelationshipExists,

    #[error("A block exists between these users")]
    RecipientBlocked,

    #[error("Email or password is incorrect")]
    InvalidCredentials,

    #[error("Session has expired")]
    SessionExpired,

    #[error("Invalid session data")]
    InvalidSession,

    #[error("Access token has expired")]
    TokenExpired,

    #[error("Access token is invalid")]
    InvalidToken,

    #[error("Friend limit of {limit} reached")]
    MaxFriends { limit: i64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::UserNotFound(_) => "USER_NOT_FOUND",
            CoreError::NoSessionsFound => "SESSION_NOT_FOUND",
            CoreError::DuplicateEmail => "EMAIL_ALREADY_REGISTERED",
            CoreError::DuplicateUsername => "USERNAME_ALREADY_REGISTERED",
            CoreError::SameUser => "SAME_USER",
            CoreError::RelationshipExists => "RELATIONSHIP_EXISTS",
            CoreError::RecipientBlocked => "RECIPIENT_BLOCKED",
            CoreError::InvalidCredentials => "INVALID_CREDENTIALS",
            CoreError::SessionExpired => "SESSION_EXPIRED",
            CoreError::InvalidSession => "INVALID_SESSION",
            CoreError::TokenExpired => "TOKEN_EXPIRED",
            CoreError::InvalidToken => "INVALID_TOKEN",
            CoreError::MaxFriends { .. } => "MAX_FRIENDS",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::UserNotFound(_) | CoreError::NoSessionsFound => ErrorKind::NotFound,
            CoreError::DuplicateEmail
            | CoreError::DuplicateUsername
            | CoreError::SameUser
            | CoreError::RelationshipExists
            | CoreError::RecipientBlocked => ErrorKind::Conflict,
            CoreError::InvalidCredentials
            | CoreError::SessionExpired
            | CoreError::InvalidSession
            | CoreError::TokenExpired
            | CoreError::InvalidToken => ErrorKind::Unauthorized,
            CoreError::MaxFriends { .. } => ErrorKind::ResourceLimit,
            CoreError::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
