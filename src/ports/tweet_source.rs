//! Tweet Source Port - Long-lived Line-oriented Stream Connections
//!
//! A connector opens one streaming connection; the connection hands out
//! raw lines until the remote side closes it. Dropping the connection
//! releases it.

use async_trait::async_trait;

use crate::error::ApiError;

/// Opens connections to the streaming endpoint.
#[async_trait]
pub trait StreamConnector: Send + Sync + 'static {
  /// Open connection type.
  type Lines: LineStream;

  /// Open a fresh connection.
  ///
  /// A 401/403 from the endpoint must come back as an
  /// `ApiError::Status` so the caller can tell it from a transient
  /// failure.
  async fn connect(&self) -> Result<Self::Lines, ApiError>;
}

/// One open streaming connection.
#[async_trait]
pub trait LineStream: Send {
  /// Next line without its terminator, blank keep-alives included.
  ///
  /// `Ok(None)` means the remote side closed the connection.
  async fn next_line(&mut self) -> Result<Option<String>, ApiError>;
}
