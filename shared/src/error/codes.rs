//! Unified error codes for the stock-relay service
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 3xxx: Connection errors
//! - 4xxx: Order errors
//! - 6xxx: Product errors
//! - 7xxx: Sync errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and stable wire compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated
    NotAuthenticated = 1001,
    /// Invalid API credentials
    InvalidCredentials = 1002,
    /// Access token has expired
    TokenExpired = 1003,
    /// Permission denied by the remote system
    PermissionDenied = 1004,

    // ==================== 3xxx: Connection ====================
    /// Connection not found
    ConnectionNotFound = 3001,
    /// Connection is disabled
    ConnectionDisabled = 3002,
    /// Platform kind is not supported
    PlatformNotSupported = 3003,
    /// Remote store not found
    StoreNotFound = 3004,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order payment is not in a completed state
    OrderNotPaid = 4002,
    /// Order was already mirrored into the ledger
    OrderAlreadyMirrored = 4003,
    /// Order has no line items
    OrderEmpty = 4004,

    // ==================== 6xxx: Product ====================
    /// Product not found in the ledger
    ProductNotFound = 6001,
    /// Line item has no SKU
    SkuMissing = 6002,
    /// No ledger product matches the SKU
    SkuUnmapped = 6003,

    // ==================== 7xxx: Sync ====================
    /// Sync failure record not found
    SyncFailureNotFound = 7001,
    /// Sync failure is already resolved
    SyncAlreadyResolved = 7002,
    /// The ledger rejected the request
    LedgerRejected = 7003,
    /// The storefront rejected the request
    StorefrontRejected = 7004,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timeout
    TimeoutError = 9004,
    /// Remote rate limit hit
    RateLimited = 9005,
    /// Configuration error
    ConfigError = 9006,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",

            // Auth
            ErrorCode::NotAuthenticated => "Caller is not authenticated",
            ErrorCode::InvalidCredentials => "Invalid API credentials",
            ErrorCode::TokenExpired => "Access token has expired",
            ErrorCode::PermissionDenied => "Permission denied",

            // Connection
            ErrorCode::ConnectionNotFound => "Connection not found",
            ErrorCode::ConnectionDisabled => "Connection is disabled",
            ErrorCode::PlatformNotSupported => "Platform kind is not supported",
            ErrorCode::StoreNotFound => "Remote store not found",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderNotPaid => "Order payment is not completed",
            ErrorCode::OrderAlreadyMirrored => "Order was already mirrored into the ledger",
            ErrorCode::OrderEmpty => "Order has no line items",

            // Product
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::SkuMissing => "Line item has no SKU",
            ErrorCode::SkuUnmapped => "No ledger product matches the SKU",

            // Sync
            ErrorCode::SyncFailureNotFound => "Sync failure record not found",
            ErrorCode::SyncAlreadyResolved => "Sync failure is already resolved",
            ErrorCode::LedgerRejected => "The ledger rejected the request",
            ErrorCode::StorefrontRejected => "The storefront rejected the request",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::RateLimited => "Remote rate limit hit",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::PermissionDenied),

            // Connection
            3001 => Ok(ErrorCode::ConnectionNotFound),
            3002 => Ok(ErrorCode::ConnectionDisabled),
            3003 => Ok(ErrorCode::PlatformNotSupported),
            3004 => Ok(ErrorCode::StoreNotFound),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderNotPaid),
            4003 => Ok(ErrorCode::OrderAlreadyMirrored),
            4004 => Ok(ErrorCode::OrderEmpty),

            // Product
            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::SkuMissing),
            6003 => Ok(ErrorCode::SkuUnmapped),

            // Sync
            7001 => Ok(ErrorCode::SyncFailureNotFound),
            7002 => Ok(ErrorCode::SyncAlreadyResolved),
            7003 => Ok(ErrorCode::LedgerRejected),
            7004 => Ok(ErrorCode::StorefrontRejected),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::RateLimited),
            9006 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
