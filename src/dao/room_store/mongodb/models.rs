use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    AnswerEntity, RoomEntity, RoomStatus, RoundEntity, RoundStatus, ScoreEntity, VoteEntity,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoomDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    name: String,
    host_id: Uuid,
    members: Vec<Uuid>,
    status: RoomStatus,
    created_at: DateTime,
}

impl From<RoomEntity> for MongoRoomDocument {
    fn from(value: RoomEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            host_id: value.host_id,
            members: value.members,
            status: value.status,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoRoomDocument> for RoomEntity {
    fn from(value: MongoRoomDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
            host_id: value.host_id,
            members: value.members,
            status: value.status,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoundDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    room_id: Uuid,
    sequence: u32,
    question: String,
    status: RoundStatus,
}

impl From<RoundEntity> for MongoRoundDocument {
    fn from(value: RoundEntity) -> Self {
        Self {
            id: value.id,
            room_id: value.room_id,
            sequence: value.sequence,
            question: value.question,
            status: value.status,
        }
    }
}

impl From<MongoRoundDocument> for RoundEntity {
    fn from(value: MongoRoundDocument) -> Self {
        Self {
            id: value.id,
            room_id: value.room_id,
            sequence: value.sequence,
            question: value.question,
            status: value.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoAnswerDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    round_id: Uuid,
    author_id: Uuid,
    content: String,
    submitted_at: DateTime,
}

impl From<AnswerEntity> for MongoAnswerDocument {
    fn from(value: AnswerEntity) -> Self {
        Self {
            id: value.id,
            round_id: value.round_id,
            author_id: value.author_id,
            content: value.content,
            submitted_at: DateTime::from_system_time(value.submitted_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoVoteDocument {
    round_id: Uuid,
    answer_id: Uuid,
    voter_id: Uuid,
}

impl From<VoteEntity> for MongoVoteDocument {
    fn from(value: VoteEntity) -> Self {
        Self {
            round_id: value.round_id,
            answer_id: value.answer_id,
            voter_id: value.voter_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoScoreDocument {
    room_id: Uuid,
    user_id: Uuid,
    points: u32,
    first_scored_at: DateTime,
}

impl From<MongoScoreDocument> for ScoreEntity {
    fn from(value: MongoScoreDocument) -> Self {
        Self {
            user_id: value.user_id,
            room_id: value.room_id,
            points: value.points,
            first_scored_at: value.first_scored_at.to_system_time(),
        }
    }
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
