//! Device lifecycle state published as `$state`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Homie device lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    /// Connected, announcement in progress.
    #[default]
    Init,
    /// Fully announced and operational.
    Ready,
    /// Cleanly disconnected.
    Disconnected,
    /// Low-power sleep; returns to [`Ready`](Self::Ready) on wake.
    Sleeping,
    /// Unclean disconnect, only ever published by the broker as the last will.
    Lost,
    /// Operational but reporting a fault.
    Alert,
}

impl DeviceState {
    /// Wire value used in `$state`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Ready => "ready",
            Self::Disconnected => "disconnected",
            Self::Sleeping => "sleeping",
            Self::Lost => "lost",
            Self::Alert => "alert",
        }
    }

    /// Whether values and stats may be published in this state.
    #[must_use]
    pub fn is_operational(self) -> bool {
        matches!(self, Self::Ready | Self::Alert)
    }

    /// Whether the device may move from `self` to `next` locally.
    ///
    /// `init` is reachable from anywhere (every reconnect replays the
    /// announcement); `lost` is never entered locally.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match next {
            Self::Init => true,
            Self::Ready => matches!(self, Self::Init | Self::Ready | Self::Alert | Self::Sleeping),
            Self::Alert => matches!(self, Self::Ready | Self::Alert),
            Self::Sleeping => matches!(self, Self::Ready | Self::Sleeping),
            Self::Disconnected => self != Self::Lost,
            Self::Lost => false,
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown `$state` value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown device state {0:?}")]
pub struct UnknownStateError(pub String);

impl FromStr for DeviceState {
    type Err = UnknownStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "init" => Ok(Self::Init),
            "ready" => Ok(Self::Ready),
            "disconnected" => Ok(Self::Disconnected),
            "sleeping" => Ok(Self::Sleeping),
            "lost" => Ok(Self::Lost),
            "alert" => Ok(Self::Alert),
            other => Err(UnknownStateError(other.to_string())),
        }
    }
}
