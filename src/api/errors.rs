use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::domain::catalog::CatalogError;
use crate::domain::order::OrderError;
use crate::loading::LoadError;
use crate::service::ServiceError;
use crate::store::StoreError;

fn store_status(e: &StoreError) -> StatusCode {
    match e {
        StoreError::VersionConflict { .. } | StoreError::StockUnderflow { .. } => StatusCode::CONFLICT,
        StoreError::Database(_) | StoreError::Integrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::MemberNotFound(_) | ServiceError::ItemNotFound(_) | ServiceError::OrderNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ServiceError::Order(e) => match e {
                OrderError::AlreadyCompleted(_)
                | OrderError::AlreadyCancelled(_)
                | OrderError::Catalog(CatalogError::NotEnoughStock { .. }) => StatusCode::CONFLICT,
                OrderError::Catalog(CatalogError::UnknownItem(_)) => StatusCode::NOT_FOUND,
                OrderError::EmptyItems
                | OrderError::InvalidQuantity(_)
                | OrderError::Catalog(CatalogError::InvalidQuantity(_)) => StatusCode::BAD_REQUEST,
            },
            ServiceError::Load(LoadError::Store(e)) | ServiceError::Store(e) => store_status(e),
            ServiceError::Load(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            ServiceError::Load(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        HttpResponse::build(status).json(serde_json::json!({
            "status": status.as_u16(),
            "error": self.to_string(),
        }))
    }
}
