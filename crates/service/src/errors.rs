use thiserror::Error;

use crate::mapping::MappingError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),
    #[error("database error: {0}")]
    Backend(#[from] sea_orm::DbErr),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }
    pub fn invalid(msg: impl Into<String>) -> Self { Self::InvalidArgument(msg.into()) }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Turn a missing row into `ServiceError::NotFound`.
pub trait OrNotFound<T> {
    fn or_not_found(self, entity: &str) -> ServiceResult<T>;
}

impl<T> OrNotFound<T> for Option<T> {
    fn or_not_found(self, entity: &str) -> ServiceResult<T> {
        self.ok_or_else(|| ServiceError::not_found(entity))
    }
}
