//! Database module for the HomeLink server
//!
//! This module holds the row models for the marketplace tables and the
//! data access layer over the shared connection pool.

pub mod models;
pub mod operations;

pub use models::{
    AuditLogEntry, Booking, BookingStatus, ClientRequest, FinancialRule, FinancialTransaction,
    Mission, MissionStatus, Provider, RequestStatus, Role, TransactionStatus, User, UserSession,
};
pub use operations::MarketplaceDb;
