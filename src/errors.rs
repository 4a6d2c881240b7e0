use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::{dtos::ApiError, repositories::StoreError};

pub const VENTURE_NOT_FOUND: &str = "Emprendimiento no encontrado";
pub const PRODUCT_NOT_FOUND: &str = "Producto no encontrado";
pub const NAME_REQUIRED: &str = "El campo nombre es obligatorio para identificar el producto";
pub const INTERNAL_ERROR: &str = "Error interno del servidor";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn missing_field(field: &str) -> Self {
        ServiceError::Validation(format!("El campo {} es obligatorio", field))
    }

    pub fn venture_not_found() -> Self {
        ServiceError::NotFound(String::from(VENTURE_NOT_FOUND))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = match self {
            // Detail is logged where the failure is observed.
            ServiceError::Store(_) => String::from(INTERNAL_ERROR),
            other => other.to_string(),
        };

        (status, Json(ApiError { error })).into_response()
    }
}
