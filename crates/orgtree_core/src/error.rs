use crate::gateway::GatewayError;
use crate::id::{PersonnelId, PositionId};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DirectoryError {
    #[error("Directory service unavailable during {operation}")]
    #[diagnostic(
        code(orgtree_core::directory_unavailable),
        help("Check connectivity and credentials for the directory service (ids: {ids})")
    )]
    DirectoryUnavailable {
        operation: String,
        ids: String,
        #[source]
        cause: GatewayError,
    },

    #[error("User {id} not found")]
    #[diagnostic(
        code(orgtree_core::user_not_found),
        help("The directory returned no personnel record for this id")
    )]
    UserNotFound { id: PersonnelId },

    #[error("User {user_id} does not have subordinates")]
    #[diagnostic(
        code(orgtree_core::no_subordinates),
        help("Team operations require at least one direct report")
    )]
    NoSubordinates { user_id: PersonnelId },

    #[error("Employee {employee_id} is not in the subordinates")]
    #[diagnostic(
        code(orgtree_core::employee_not_in_subordinates),
        help("The employee must be reachable from the caller's position")
    )]
    EmployeeNotInSubordinates { employee_id: PersonnelId },

    #[error("Employee {employee_id} is not a laborer")]
    #[diagnostic(
        code(orgtree_core::not_a_laborer),
        help("This operation is limited to personnel on worker positions")
    )]
    NotALaborer { employee_id: PersonnelId },

    #[error("User {user_id} is a laborer")]
    #[diagnostic(
        code(orgtree_core::is_a_laborer),
        help("This operation is not available to personnel on worker positions")
    )]
    IsALaborer { user_id: PersonnelId },

    #[error("No authenticated user for {operation}")]
    #[diagnostic(
        code(orgtree_core::unauthenticated),
        help("Create the operation context with the caller's personnel record")
    )]
    Unauthenticated { operation: String },

    #[error("User {user_id} does not have a current position")]
    #[diagnostic(
        code(orgtree_core::no_current_position),
        help("Only positions held without acting status and with employment count as current")
    )]
    NoCurrentPosition { user_id: PersonnelId },

    #[error("Position {position_id} not found")]
    #[diagnostic(code(orgtree_core::position_not_found))]
    PositionNotFound { position_id: PositionId },

    #[error("Configuration error")]
    #[diagnostic(
        code(orgtree_core::configuration_error),
        help("Check configuration file at {config_path}")
    )]
    ConfigurationError {
        config_path: String,
        field: String,
        expected: String,
        #[source]
        cause: ConfigError,
    },
}

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(String),

    #[error("Invalid value: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, DirectoryError>;

// Helper functions for creating common errors with context
impl DirectoryError {
    pub fn unavailable(
        operation: impl Into<String>,
        ids: impl Into<String>,
        cause: GatewayError,
    ) -> Self {
        Self::DirectoryUnavailable {
            operation: operation.into(),
            ids: ids.into(),
            cause,
        }
    }

    /// Log a directory failure with its context and wrap it. Guard errors
    /// are expected control flow and never go through here.
    pub fn logged_unavailable(
        operation: &'static str,
        ids: impl Into<String>,
        cause: GatewayError,
    ) -> Self {
        let ids = ids.into();
        tracing::error!(operation, ids = %ids, error = %cause, "directory lookup failed");
        Self::unavailable(operation, ids, cause)
    }

    pub fn unauthenticated(operation: impl Into<String>) -> Self {
        Self::Unauthenticated {
            operation: operation.into(),
        }
    }

    /// True for failures of the directory service itself, as opposed to
    /// domain guards that reject the request.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::DirectoryUnavailable { .. } | Self::ConfigurationError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Report;

    #[test]
    fn test_unavailable_error_report() {
        let error = DirectoryError::unavailable(
            "fetch_personnel",
            "u-1,u-2",
            GatewayError::Status {
                endpoint: "/internal/personnel-numbers".to_string(),
                status: 503,
            },
        );
        assert!(error.is_infrastructure());

        let report = Report::new(error);
        let output = format!("{:?}", report);
        assert!(output.contains("directory_unavailable"));
        assert!(output.contains("u-1,u-2"));
    }

    #[test]
    fn test_guard_errors_carry_offending_id() {
        let error = DirectoryError::EmployeeNotInSubordinates {
            employee_id: PersonnelId::new("u-77"),
        };
        assert!(!error.is_infrastructure());
        assert!(error.to_string().contains("u-77"));
    }
}
