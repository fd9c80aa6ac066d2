use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// License a song is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum License {
    #[default]
    AllRightsReserved,
    CcBy,
    CcBySa,
    CcByNd,
    CcByNc,
    CcByNcSa,
    CcByNcNd,
    Cc0,
}

impl std::fmt::Display for License {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            License::AllRightsReserved => write!(f, "all-rights-reserved"),
            License::CcBy => write!(f, "cc-by"),
            License::CcBySa => write!(f, "cc-by-sa"),
            License::CcByNd => write!(f, "cc-by-nd"),
            License::CcByNc => write!(f, "cc-by-nc"),
            License::CcByNcSa => write!(f, "cc-by-nc-sa"),
            License::CcByNcNd => write!(f, "cc-by-nc-nd"),
            License::Cc0 => write!(f, "cc0"),
        }
    }
}

impl FromStr for License {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all-rights-reserved" => Ok(License::AllRightsReserved),
            "cc-by" => Ok(License::CcBy),
            "cc-by-sa" => Ok(License::CcBySa),
            "cc-by-nd" => Ok(License::CcByNd),
            "cc-by-nc" => Ok(License::CcByNc),
            "cc-by-nc-sa" => Ok(License::CcByNcSa),
            "cc-by-nc-nd" => Ok(License::CcByNcNd),
            "cc0" => Ok(License::Cc0),
            other => Err(format!("unknown license: {}", other)),
        }
    }
}

/// Lifecycle of a contributed track. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackRequestStatus {
    Pending,
    Approved,
    Declined,
}

impl TrackRequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TrackRequestStatus::Pending)
    }
}

impl std::fmt::Display for TrackRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackRequestStatus::Pending => write!(f, "pending"),
            TrackRequestStatus::Approved => write!(f, "approved"),
            TrackRequestStatus::Declined => write!(f, "declined"),
        }
    }
}

impl FromStr for TrackRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TrackRequestStatus::Pending),
            "approved" => Ok(TrackRequestStatus::Approved),
            "declined" => Ok(TrackRequestStatus::Declined),
            other => Err(format!("unknown track request status: {}", other)),
        }
    }
}

/// Events delivered to a user's notification inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationVerb {
    TrackRequestPending,
    TrackRequestApproved,
    TrackRequestDeclined,
}

impl std::fmt::Display for NotificationVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationVerb::TrackRequestPending => write!(f, "track_request_pending"),
            NotificationVerb::TrackRequestApproved => write!(f, "track_request_approved"),
            NotificationVerb::TrackRequestDeclined => write!(f, "track_request_declined"),
        }
    }
}

impl FromStr for NotificationVerb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "track_request_pending" => Ok(NotificationVerb::TrackRequestPending),
            "track_request_approved" => Ok(NotificationVerb::TrackRequestApproved),
            "track_request_declined" => Ok(NotificationVerb::TrackRequestDeclined),
            other => Err(format!("unknown notification verb: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Something a user lists as able to play or do. Names are unique per user,
/// ignoring case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Skill {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: String,
}

/// Reference to an audio object held in the object store.
///
/// The four fields travel together: a record either has all of them or none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRef {
    pub url: String,
    pub name: String,
    pub content_type: String,
    pub size: i64,
}

impl AudioRef {
    /// Builds a reference from nullable columns; partial rows yield `None`.
    pub fn from_columns(
        url: Option<String>,
        name: Option<String>,
        content_type: Option<String>,
        size: Option<i64>,
    ) -> Option<Self> {
        match (url, name, content_type, size) {
            (Some(url), Some(name), Some(content_type), Some(size)) => Some(Self {
                url,
                name,
                content_type,
                size,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub uuid: String,
    pub title: String,
    pub description: String,
    pub license: License,
    pub published: bool,
    pub created_by: i64,
    pub owner: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SongStats {
    pub views: i64,
    pub likes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub uuid: String,
    pub song_id: i64,
    pub instrument: String,
    pub public: bool,
    pub audio: Option<AudioRef>,
    pub created_by: i64,
    pub contributed_by: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Track {
    /// Open slots carry no audio, filled tracks carry all of it.
    pub fn audio_invariant_holds(&self) -> bool {
        self.public == self.audio.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRequest {
    pub id: i64,
    pub uuid: String,
    pub track_id: i64,
    pub created_by: i64,
    pub audio: AudioRef,
    pub status: TrackRequestStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub actor_id: i64,
    pub recipient_id: i64,
    pub verb: NotificationVerb,
    pub action_object_id: Option<i64>,
    pub target_id: Option<i64>,
    pub unread: bool,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            TrackRequestStatus::Pending,
            TrackRequestStatus::Approved,
            TrackRequestStatus::Declined,
        ] {
            assert_eq!(status.to_string().parse::<TrackRequestStatus>(), Ok(status));
        }
        assert!("archived".parse::<TrackRequestStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TrackRequestStatus::Pending.is_terminal());
        assert!(TrackRequestStatus::Approved.is_terminal());
        assert!(TrackRequestStatus::Declined.is_terminal());
    }

    #[test]
    fn test_license_serde_matches_display() {
        let json = serde_json::to_string(&License::CcByNcSa).unwrap();
        assert_eq!(json, "\"cc-by-nc-sa\"");
        assert_eq!("cc-by-nc-sa".parse::<License>(), Ok(License::CcByNcSa));
        assert_eq!(License::default(), License::AllRightsReserved);
    }

    #[test]
    fn test_audio_ref_requires_all_columns() {
        assert!(AudioRef::from_columns(
            Some("local://a".into()),
            Some("a.mp3".into()),
            Some("audio/mpeg".into()),
            Some(10)
        )
        .is_some());
        assert!(AudioRef::from_columns(Some("local://a".into()), None, None, Some(10)).is_none());
    }
}
