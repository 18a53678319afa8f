//! Core business logic, independent of the Discord layer.
//!
//! Functions take a `sea_orm` connection and return [`crate::errors::Result`].
//! Anything that writes more than one row runs inside a database transaction.

pub mod audit;
pub mod auth;
pub mod changes;
pub mod lifecycle;
pub mod metrics;
pub mod notification;
pub mod partner;
pub mod pickup;
pub mod reward;
pub mod voucher;
pub mod waste_request;
