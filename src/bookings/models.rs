use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Kind of a scheduled event slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// One-on-one session, quota fixed at 1
    Personal,
    /// Capacity-limited group session
    Group,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Personal => "personal",
            EventKind::Group => "group",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain model representing an event in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub coach_id: i32,
    pub kind: EventKind,
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub quota: i32,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Whether the event is at capacity given its current participant count
    pub fn is_full(&self, participant_count: i64) -> bool {
        participant_count >= i64::from(self.quota)
    }
}

/// Domain model representing a participant row
///
/// A member participant carries member_id and consumed one credit when
/// admitted; a guest carries a name and optional contact and never touches
/// the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Participant {
    pub id: Uuid,
    pub event_id: Uuid,
    pub member_id: Option<i32>,
    pub guest_name: Option<String>,
    pub guest_contact: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Participant {
    pub fn is_member(&self) -> bool {
        self.member_id.is_some()
    }
}

/// Domain view of a participant request, after validation
#[derive(Debug, Clone, PartialEq)]
pub enum ParticipantKind {
    Member(i32),
    Guest {
        name: String,
        contact: Option<String>,
    },
}

/// Request DTO for one participant
///
/// The id is the booking's idempotency key: a retried request must carry
/// the same id so the replay is detected instead of double-debited. Omitted
/// ids are generated server-side, forfeiting replay detection for that
/// booking.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ParticipantRequest {
    pub id: Option<Uuid>,
    pub member_id: Option<i32>,
    pub guest_name: Option<String>,
    pub guest_contact: Option<String>,
}

impl ParticipantRequest {
    /// Classify the request as a member or guest booking. Exactly one of
    /// member_id / guest_name must be supplied.
    pub fn kind(&self) -> Result<ParticipantKind, String> {
        match (self.member_id, &self.guest_name) {
            (Some(member_id), None) => Ok(ParticipantKind::Member(member_id)),
            (None, Some(name)) => {
                if name.trim().is_empty() {
                    return Err("Guest name must not be empty".to_string());
                }
                Ok(ParticipantKind::Guest {
                    name: name.clone(),
                    contact: self.guest_contact.clone(),
                })
            }
            (Some(_), Some(_)) => {
                Err("A participant is either a member or a guest, not both".to_string())
            }
            (None, None) => Err("A participant needs a member_id or a guest_name".to_string()),
        }
    }
}

/// Request DTO for creating a new event
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEventRequest {
    /// Coach the event belongs to; only honored for admin actors
    pub coach_id: Option<i32>,
    pub kind: EventKind,
    pub event_date: NaiveDate,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "10:00:00")]
    pub end_time: NaiveTime,
    /// Required for group events; personal events are always quota 1
    pub quota: Option<i32>,
    #[serde(default)]
    pub participants: Vec<ParticipantRequest>,
}

/// Query parameters carrying the refund-or-burn choice
///
/// Deliberately has no default: whether a removed member's credit comes
/// back is a business decision the caller must state every time.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RefundChoice {
    pub refund: bool,
}

/// Query parameters for the schedule listing
#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub coach_id: Option<i32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Response DTO for an event with its participants
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub coach_id: i32,
    pub kind: EventKind,
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub quota: i32,
    pub participants: Vec<Participant>,
    pub created_at: DateTime<Utc>,
}

impl EventResponse {
    pub fn new(event: Event, participants: Vec<Participant>) -> Self {
        Self {
            id: event.id,
            coach_id: event.coach_id,
            kind: event.kind,
            event_date: event.event_date,
            start_time: event.start_time,
            end_time: event.end_time,
            quota: event.quota,
            participants,
            created_at: event.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: EventKind, quota: i32) -> Event {
        Event {
            id: Uuid::new_v4(),
            coach_id: 1,
            kind,
            event_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            quota,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_event_capacity() {
        let e = event(EventKind::Group, 2);
        assert!(!e.is_full(0));
        assert!(!e.is_full(1));
        assert!(e.is_full(2));
        assert!(e.is_full(3));
    }

    #[test]
    fn test_personal_event_capacity() {
        let e = event(EventKind::Personal, 1);
        assert!(!e.is_full(0));
        assert!(e.is_full(1));
    }

    #[test]
    fn test_participant_request_member() {
        let request = ParticipantRequest {
            id: None,
            member_id: Some(5),
            guest_name: None,
            guest_contact: None,
        };
        assert_eq!(request.kind().unwrap(), ParticipantKind::Member(5));
    }

    #[test]
    fn test_participant_request_guest() {
        let request = ParticipantRequest {
            id: None,
            member_id: None,
            guest_name: Some("Sam Blake".to_string()),
            guest_contact: Some("sam@example.com".to_string()),
        };
        assert_eq!(
            request.kind().unwrap(),
            ParticipantKind::Guest {
                name: "Sam Blake".to_string(),
                contact: Some("sam@example.com".to_string()),
            }
        );
    }

    #[test]
    fn test_participant_request_rejects_both() {
        let request = ParticipantRequest {
            id: None,
            member_id: Some(5),
            guest_name: Some("Sam".to_string()),
            guest_contact: None,
        };
        assert!(request.kind().is_err());
    }

    #[test]
    fn test_participant_request_rejects_neither() {
        let request = ParticipantRequest {
            id: None,
            member_id: None,
            guest_name: None,
            guest_contact: None,
        };
        assert!(request.kind().is_err());
    }

    #[test]
    fn test_participant_request_rejects_blank_guest_name() {
        let request = ParticipantRequest {
            id: None,
            member_id: None,
            guest_name: Some("   ".to_string()),
            guest_contact: None,
        };
        assert!(request.kind().is_err());
    }

    #[test]
    fn test_refund_choice_requires_explicit_flag() {
        // Missing refund is a deserialization error, not a default
        assert!(serde_json::from_str::<RefundChoice>("{}").is_err());

        let choice: RefundChoice = serde_json::from_str(r#"{"refund":false}"#).unwrap();
        assert!(!choice.refund);
    }

    #[test]
    fn test_event_kind_serde() {
        assert_eq!(
            serde_json::to_string(&EventKind::Personal).unwrap(),
            "\"personal\""
        );
        let parsed: EventKind = serde_json::from_str("\"group\"").unwrap();
        assert_eq!(parsed, EventKind::Group);
    }
}
