use std::fmt::{self, Display};

use warp::{http::StatusCode, reject::Reject};

use super::schema::Id;

#[derive(Debug, Clone)]
pub struct QueryError {
    info: String,
    unique_violation: bool,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            unique_violation: false,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.unique_violation
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => Self {
                info: format!("{e}"),
                unique_violation: e.is_unique_violation(),
            },
            sqlx::Error::RowNotFound => Self::new(format!("RowNotFound")),
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("Column not found: {e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::PoolTimedOut => Self::new(format!("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(format!("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(format!("Worker crashed")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for QueryError {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Self::new(format!("Migration failed: {value}"))
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

impl std::error::Error for QueryError {}

/// Input problems. Rendered to the client as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingField(&'static str),
    FieldTooLong(&'static str, usize),
    EmptyTags,
    DuplicateTags,
    UnknownTags(Vec<Id>),
    EmptyIngredients,
    DuplicateIngredients,
    UnknownIngredients(Vec<Id>),
    AmountTooSmall,
    CookingTimeTooSmall,
    InvalidSlug,
    InvalidUsername,
    InvalidEmail,
    InvalidImage(String),
    InvalidCredentials,
}

fn id_list(ids: &[Id]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingField(field) => write!(f, "Field '{field}' is required"),
            ValidationError::FieldTooLong(field, max) => {
                write!(f, "Field '{field}' can not be longer than {max} characters")
            }
            ValidationError::EmptyTags => write!(f, "Please add tag"),
            ValidationError::DuplicateTags => write!(f, "Tags must be unique"),
            ValidationError::UnknownTags(ids) => {
                write!(f, "Tags with id [{}] do not exist", id_list(ids))
            }
            ValidationError::EmptyIngredients => write!(f, "Please add ingredient"),
            ValidationError::DuplicateIngredients => write!(f, "Ingredients must be unique"),
            ValidationError::UnknownIngredients(ids) => {
                write!(f, "Ingredients with id [{}] do not exist", id_list(ids))
            }
            ValidationError::AmountTooSmall => write!(f, "Minimum amount is 1"),
            ValidationError::CookingTimeTooSmall => {
                write!(f, "Cooking time can not be less than 1 minute(s)")
            }
            ValidationError::InvalidSlug => write!(
                f,
                "Slug contains restricted symbols. Please use only letters, numbers and _ symbol"
            ),
            ValidationError::InvalidUsername => write!(
                f,
                "Username contains restricted symbols. Please use only letters, numbers and .@+- symbols"
            ),
            ValidationError::InvalidEmail => write!(f, "Enter a valid email address"),
            ValidationError::InvalidImage(info) => write!(f, "Invalid image: {info}"),
            ValidationError::InvalidCredentials => write!(f, "Invalid credentials"),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    Validation(ValidationError),
    IncompleteUpdate(&'static str),
    SelfReference,
    Conflict(String),
    EdgeNotFound(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden,
    Query(QueryError),
    Internal(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_)
            | Error::IncompleteUpdate(_)
            | Error::SelfReference
            | Error::Conflict(_)
            | Error::EdgeNotFound(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::Query(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Key of the single-field JSON body the error is rendered into.
    pub fn body_key(&self) -> &'static str {
        match self {
            Error::Validation(_) | Error::IncompleteUpdate(_) | Error::SelfReference => "errors",
            _ => "detail",
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(e) => write!(f, "{e}"),
            Error::IncompleteUpdate(field) => {
                write!(f, "Field '{field}' is required when updating a recipe")
            }
            Error::SelfReference => write!(f, "You can't (un)subscribe to yourself"),
            Error::Conflict(info)
            | Error::EdgeNotFound(info)
            | Error::NotFound(info)
            | Error::Unauthorized(info) => write!(f, "{info}"),
            Error::Forbidden => write!(f, "You don't have permission to perform this action"),
            Error::Query(_) | Error::Internal(_) => write!(f, "Internal server error"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ValidationError> for Error {
    fn from(value: ValidationError) -> Self {
        Error::Validation(value)
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        if value.is_unique_violation() {
            Error::Conflict(format!("Object already exists"))
        } else {
            Error::Query(value)
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        QueryError::from(value).into()
    }
}

impl Reject for Error {}
