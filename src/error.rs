use thiserror::Error;

/// Errors produced by the order lifecycle engine.
///
/// The first group are domain rejections: the request was understood but is not legal for the
/// current state of the order. The second group are infrastructure failures.
#[derive(Error, Debug)]
pub enum OrderError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExist(String),
    #[error("wrong input: {0}")]
    WrongInput(String),
    #[error("wrong status: {0}")]
    WrongStatus(String),
    #[error("expiration date has passed: {0}")]
    ExpirationDatePassed(String),
    #[error("expiration date has not come yet: {0}")]
    NotExpirationDate(String),
    #[error("two days have passed: {0}")]
    TwoDaysPassed(String),
    #[error("{}", join_batch(.0))]
    Batch(Vec<OrderError>),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[cfg(feature = "storage-postgres")]
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    InternalError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, OrderError>;

fn join_batch(errors: &[OrderError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Coarse classification of an [`OrderError`], used by transports to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExist,
    InvalidArgument,
    FailedPrecondition,
    Internal,
}

impl ErrorKind {
    pub fn grpc_code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::AlreadyExist => "ALREADY_EXISTS",
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::FailedPrecondition => "FAILED_PRECONDITION",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::AlreadyExist | ErrorKind::FailedPrecondition => 409,
            ErrorKind::InvalidArgument => 400,
            ErrorKind::Internal => 500,
        }
    }
}

impl OrderError {
    pub fn internal(message: impl Into<String>) -> Self {
        OrderError::InternalError(Box::new(std::io::Error::other(message.into())))
    }

    /// Folds per-order failures into one error; a single failure is returned as itself.
    pub fn batch(mut errors: Vec<OrderError>) -> Self {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            OrderError::Batch(errors)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::NotFound(_) => ErrorKind::NotFound,
            OrderError::AlreadyExist(_) => ErrorKind::AlreadyExist,
            OrderError::WrongInput(_) => ErrorKind::InvalidArgument,
            OrderError::WrongStatus(_)
            | OrderError::ExpirationDatePassed(_)
            | OrderError::NotExpirationDate(_)
            | OrderError::TwoDaysPassed(_) => ErrorKind::FailedPrecondition,
            // A batch reports the first failure's class; every failure is still listed.
            OrderError::Batch(errors) => errors
                .first()
                .map(OrderError::kind)
                .unwrap_or(ErrorKind::Internal),
            _ => ErrorKind::Internal,
        }
    }

    /// True when the failure came from the engine itself rather than from a rejected request.
    pub fn is_service_error(&self) -> bool {
        match self {
            OrderError::Batch(errors) => errors.iter().any(OrderError::is_service_error),
            other => other.kind() == ErrorKind::Internal,
        }
    }
}
