/// Database model definitions shared across layers.
pub mod models;
/// Game state storage backends and the [`room_store::RoomStore`] trait.
pub mod room_store;
/// Storage abstraction error types.
pub mod storage;
