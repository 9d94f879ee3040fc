//! Logical connection identity.

use std::fmt;

/// Composite cache key for one logical store connection.
///
/// Two bindings share a client exactly when their resolved connection
/// string, application name and application region all match. The identity
/// is only ever used as a key; its `Debug` form redacts the connection
/// string so it cannot leak into logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConnectionIdentity {
    connection_string: String,
    application_name: String,
    application_region: String,
}

impl ConnectionIdentity {
    /// Creates an identity from the resolved connection parts.
    pub fn new(
        connection_string: impl Into<String>,
        application_name: Option<&str>,
        application_region: Option<&str>,
    ) -> Self {
        Self {
            connection_string: connection_string.into(),
            application_name: application_name.unwrap_or_default().to_owned(),
            application_region: application_region.unwrap_or_default().to_owned(),
        }
    }

    /// Returns the resolved connection string.
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Returns the application name, empty when unset.
    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    /// Returns the application region, empty when unset.
    pub fn application_region(&self) -> &str {
        &self.application_region
    }
}

impl fmt::Debug for ConnectionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionIdentity")
            .field("connection_string", &"<redacted>")
            .field("application_name", &self.application_name)
            .field("application_region", &self.application_region)
            .finish()
    }
}
