use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identity permitted to open the control endpoint.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AccessScope {
    /// Only the account running the daemon.
    Owner,
    /// The daemon account and members of its primary group.
    Group,
    /// Any interactive account on the local machine.
    #[default]
    LocalUsers,
}

impl AccessScope {
    /// File mode applied to Unix socket files for this scope.
    #[must_use]
    pub const fn unix_mode(self) -> u32 {
        match self {
            Self::Owner => 0o600,
            Self::Group => 0o660,
            Self::LocalUsers => 0o666,
        }
    }
}

/// Errors encountered while parsing an [`AccessScope`] from text.
pub type AccessScopeParseError = strum::ParseError;
