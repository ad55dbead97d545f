//! Result alias used by HTTP handlers

use crate::AppError;

pub type AppResult<T> = Result<T, AppError>;
