//! SeaORM repository implementations

mod charge_point_repository;
mod device_repository;
mod evse_repository;
mod id_tag_repository;
mod provider;
mod session_repository;
mod site_repository;
mod tariff_repository;

pub use provider::SeaOrmRepositoryProvider;

use crate::domain::DomainError;

pub(crate) fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}
