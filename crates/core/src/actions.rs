// crates/core/src/actions.rs
//! Privileged operator actions exposed by the API server as background jobs.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservatoryAction {
    AbortFill,
    ManualFill,
    OpenDome,
    CloseDome { force: bool },
    EmergencyShutdown,
    RestartActor { actor: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionParseError {
    #[error("Unknown action: {0}")]
    Unknown(String),

    #[error("Missing actor name in {0:?} (expected restart:<actor>)")]
    MissingActor(String),
}

impl ObservatoryAction {
    /// Job submission route on the API server.
    pub fn route(&self) -> String {
        match self {
            Self::AbortFill => "/spectrographs/fills/abort".into(),
            Self::ManualFill => "/spectrographs/fills/manual-fill".into(),
            Self::OpenDome => "/enclosure/open".into(),
            Self::CloseDome { force: false } => "/enclosure/close".into(),
            Self::CloseDome { force: true } => "/enclosure/close?force=true".into(),
            Self::EmergencyShutdown => "/macros/shutdown".into(),
            Self::RestartActor { actor } => format!("/actors/restart/{actor}"),
        }
    }

    /// Label shown in notifications and error messages.
    pub fn label(&self) -> String {
        match self {
            Self::AbortFill => "abort fill".into(),
            Self::ManualFill => "manual fill".into(),
            Self::OpenDome => "open dome".into(),
            Self::CloseDome { .. } => "close dome".into(),
            Self::EmergencyShutdown => "emergency shutdown".into(),
            Self::RestartActor { actor } => format!("restart {actor}"),
        }
    }
}

impl fmt::Display for ObservatoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AbortFill => f.write_str("abort-fill"),
            Self::ManualFill => f.write_str("manual-fill"),
            Self::OpenDome => f.write_str("open-dome"),
            Self::CloseDome { force: false } => f.write_str("close-dome"),
            Self::CloseDome { force: true } => f.write_str("force-close-dome"),
            Self::EmergencyShutdown => f.write_str("shutdown"),
            Self::RestartActor { actor } => write!(f, "restart:{actor}"),
        }
    }
}

impl FromStr for ObservatoryAction {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(actor) = s.strip_prefix("restart:") {
            let actor = actor.trim();
            if actor.is_empty() {
                return Err(ActionParseError::MissingActor(s.to_string()));
            }
            return Ok(Self::RestartActor {
                actor: actor.to_string(),
            });
        }
        match s {
            "abort-fill" => Ok(Self::AbortFill),
            "manual-fill" => Ok(Self::ManualFill),
            "open-dome" => Ok(Self::OpenDome),
            "close-dome" => Ok(Self::CloseDome { force: false }),
            "force-close-dome" => Ok(Self::CloseDome { force: true }),
            "shutdown" => Ok(Self::EmergencyShutdown),
            "restart" => Err(ActionParseError::MissingActor(s.to_string())),
            other => Err(ActionParseError::Unknown(other.to_string())),
        }
    }
}
