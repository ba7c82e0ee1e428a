use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Messages accepted from player WebSocket clients.
///
/// The first frame of every connection must be `identify`; the remaining
/// variants are the player/host actions of the realtime protocol.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Bind the connection to a user and room.
    #[serde(rename = "identify")]
    Identify {
        /// Player identity (issued by the auth collaborator).
        user_id: Uuid,
        /// Room the player belongs to.
        room_id: Uuid,
    },
    /// Host action: start a game with the given number of rounds.
    #[serde(rename = "start-game")]
    StartGame {
        /// Room to start the game in.
        room_id: Uuid,
        /// Number of rounds to pre-generate.
        total_rounds: u32,
    },
    /// Submit an answer for the active round.
    #[serde(rename = "submit-answer")]
    SubmitAnswer {
        /// Room the answer belongs to.
        room_id: Uuid,
        /// Round the answer is meant for.
        round_id: Uuid,
        /// Answer text.
        content: String,
    },
    /// Cast a vote for an answer of the active round.
    #[serde(rename = "submit-vote")]
    SubmitVote {
        /// Room the vote belongs to.
        room_id: Uuid,
        /// Round the vote is meant for.
        round_id: Uuid,
        /// Ballot entry being voted for.
        answer_id: Uuid,
    },
    /// Request a full state snapshot (join or reconnect).
    #[serde(rename = "request-state")]
    RequestState {
        /// Room to snapshot.
        room_id: Uuid,
    },
    /// Any message type this server version does not understand.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse a text frame into a client message.
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Wire name of the action, used on acknowledgment and error events.
    pub fn action(&self) -> &'static str {
        match self {
            ClientMessage::Identify { .. } => "identify",
            ClientMessage::StartGame { .. } => "start-game",
            ClientMessage::SubmitAnswer { .. } => "submit-answer",
            ClientMessage::SubmitVote { .. } => "submit-vote",
            ClientMessage::RequestState { .. } => "request-state",
            ClientMessage::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify_parses_from_tagged_json() {
        let user_id = Uuid::new_v4();
        let room_id = Uuid::new_v4();
        let raw = format!(
            r#"{{"type":"identify","user_id":"{user_id}","room_id":"{room_id}"}}"#
        );
        match ClientMessage::from_json_str(&raw).unwrap() {
            ClientMessage::Identify {
                user_id: parsed_user,
                room_id: parsed_room,
            } => {
                assert_eq!(parsed_user, user_id);
                assert_eq!(parsed_room, room_id);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unknown_message_types_do_not_fail_parsing() {
        let parsed = ClientMessage::from_json_str(r#"{"type":"dance"}"#).unwrap();
        assert!(matches!(parsed, ClientMessage::Unknown));
    }

    #[test]
    fn submit_answer_round_trip() {
        let msg = ClientMessage::SubmitAnswer {
            room_id: Uuid::new_v4(),
            round_id: Uuid::new_v4(),
            content: "a moon base timeshare".into(),
        };
        let raw = serde_json::to_string(&msg).unwrap();
        let parsed = ClientMessage::from_json_str(&raw).unwrap();
        assert_eq!(parsed.action(), "submit-answer");
    }
}
