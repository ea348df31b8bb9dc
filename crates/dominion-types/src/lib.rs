//! Shared type definitions for the Dominion game engine.
//!
//! This crate holds the data model used across every other crate: strongly
//! typed identifiers, the resource/task/event enumerations, the entity
//! structs that are persisted and broadcast, and the [`EngineEvent`]
//! notification type consumed by the presentation layer.
//!
//! The crate is deliberately free of behavior beyond small constructors and
//! clamping helpers; the engines that mutate this data live in their own
//! crates (`dominion-market`, `dominion-ledger`, `dominion-combat`,
//! `dominion-tasks`, `dominion-world`).

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

pub use enums::{
    EventCategory, EventSeverity, ResourceCategory, ResourceKind, TaskKind, TaskStatus,
    TradeKind, UnitClass, Weather,
};
pub use events::EngineEvent;
pub use ids::{EntryId, PlayerId, ProvinceId, TaskId, WorldEventId};
pub use structs::{
    CombatReport, MarketPrice, Province, ResourceDef, Reward, Task, TaskDefinition, TechEffect,
    TransactionRecord, UnitSpec, WorldEvent, WorldStats,
};
