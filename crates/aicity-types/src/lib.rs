//! Shared type definitions for the AIcity simulation.
//!
//! This crate is the single source of truth for all types used across the
//! AIcity workspace. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for the Observer Dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Roles, statuses, event kinds, the visibility ladder
//! - [`structs`] -- Core entity structs (agents, transactions, events, cases, projects, gangs)
//! - [`capabilities`] -- Static role capability descriptors
//! - [`decision`] -- Reasoning-model payloads (context in, decision/verdict out)
//! - [`observer`] -- Push payloads for the observer channel

pub mod capabilities;
pub mod decision;
pub mod enums;
pub mod ids;
pub mod observer;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use capabilities::{GRADUATION_ROLES, RoleCapabilities};
pub use decision::{
    BondView, CasePrompt, Decision, DecisionContext, InboxView, NarrativeRequest, VerdictNote,
};
pub use enums::{
    ActionKind, AgentStatus, AssetStatus, AssetType, CaseStatus, CauseOfDeath, EventKind,
    GangStatus, LedgerParty, ProjectStatus, Role, TimePhase, TxKind, Visibility,
};
pub use ids::{
    AgentId, AssetId, CaseId, EventId, GangId, LotId, MessageId, ProjectId, StoryId, TxId,
};
pub use observer::{AgentView, CitySnapshot, ObserverMessage};
pub use structs::{
    AgentRecord, Asset, Bond, CaseNote, CityEvent, CityMessage, EvidenceRef, Gang, HomeLot,
    MessageSender, PoliceCase, Project, Story, StoryKind, TilePos, Transaction, TrialVerdict,
    WorldTile,
};

#[cfg(test)]
mod tests {
    //! Integration tests for type exports and `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. Importing them here triggers generation.
        // The actual files are written to the `bindings/` directory
        // relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::AgentId::export_all();
        let _ = crate::ids::EventId::export_all();
        let _ = crate::ids::TxId::export_all();
        let _ = crate::ids::CaseId::export_all();
        let _ = crate::ids::ProjectId::export_all();
        let _ = crate::ids::AssetId::export_all();
        let _ = crate::ids::GangId::export_all();
        let _ = crate::ids::MessageId::export_all();
        let _ = crate::ids::LotId::export_all();
        let _ = crate::ids::StoryId::export_all();

        // Enums
        let _ = crate::enums::Role::export_all();
        let _ = crate::enums::AgentStatus::export_all();
        let _ = crate::enums::CauseOfDeath::export_all();
        let _ = crate::enums::Visibility::export_all();
        let _ = crate::enums::EventKind::export_all();
        let _ = crate::enums::TxKind::export_all();
        let _ = crate::enums::LedgerParty::export_all();
        let _ = crate::enums::CaseStatus::export_all();
        let _ = crate::enums::ProjectStatus::export_all();
        let _ = crate::enums::AssetStatus::export_all();
        let _ = crate::enums::AssetType::export_all();
        let _ = crate::enums::GangStatus::export_all();
        let _ = crate::enums::ActionKind::export_all();
        let _ = crate::enums::TimePhase::export_all();

        // Structs
        let _ = crate::structs::AgentRecord::export_all();
        let _ = crate::structs::TilePos::export_all();
        let _ = crate::structs::Transaction::export_all();
        let _ = crate::structs::EvidenceRef::export_all();
        let _ = crate::structs::CityEvent::export_all();
        let _ = crate::structs::CaseNote::export_all();
        let _ = crate::structs::PoliceCase::export_all();
        let _ = crate::structs::TrialVerdict::export_all();
        let _ = crate::structs::Project::export_all();
        let _ = crate::structs::Asset::export_all();
        let _ = crate::structs::Gang::export_all();
        let _ = crate::structs::MessageSender::export_all();
        let _ = crate::structs::CityMessage::export_all();
        let _ = crate::structs::Bond::export_all();
        let _ = crate::structs::HomeLot::export_all();
        let _ = crate::structs::WorldTile::export_all();
        let _ = crate::structs::StoryKind::export_all();
        let _ = crate::structs::Story::export_all();

        // Decision payloads
        let _ = crate::decision::InboxView::export_all();
        let _ = crate::decision::BondView::export_all();
        let _ = crate::decision::DecisionContext::export_all();
        let _ = crate::decision::Decision::export_all();

        // Observer payloads
        let _ = crate::observer::AgentView::export_all();
        let _ = crate::observer::CitySnapshot::export_all();
        let _ = crate::observer::ObserverMessage::export_all();
    }
}
