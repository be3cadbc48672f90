//! Studbook Server - Registry service and REST API
//!
//! [`Studbook`] orchestrates validation, pedigree checks and storage for
//! every operation; [`routes`] exposes it over HTTP.

pub mod dto;
pub mod routes;
pub mod service;

pub use dto::{ErrorDto, HorseDetailDto, HorseListDto, OwnerDto, ParentDto};
pub use routes::{create_router, run_server, ApiError};
pub use service::Studbook;
