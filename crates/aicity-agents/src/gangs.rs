//! The gang system: recruitment, formation, earn multipliers, exposure,
//! and collapse.
//!
//! Gangs are leader-anchored. Desperation drives recruitment -- only agents
//! whose mood has collapsed are recruitable, and near-starvation doubles
//! their weight. A guilty verdict against the leader breaks the gang and
//! revokes every multiplier at once.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use rust_decimal::Decimal;
use tracing::{debug, info};

use aicity_types::{AgentId, Gang, GangId, GangStatus, Role};

use crate::config::GangConfig;
use crate::error::AgentError;

/// Gang name suffixes; the leader's name supplies the rest.
const NAME_SUFFIXES: [&str; 5] = ["Crew", "Syndicate", "Circle", "Hand", "Shadows"];

/// How strongly a candidate pulls toward joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecruitWeight {
    /// Not recruitable.
    None,
    /// Mood below the recruit threshold.
    Single,
    /// Mood below threshold and balance near starvation.
    Double,
}

/// Evaluate recruitability for one candidate.
///
/// Police are never recruitable; neither is anyone whose mood still holds
/// above the threshold.
pub fn recruit_weight(
    role: Role,
    mood: Decimal,
    balance: i64,
    daily_burn: i64,
    config: &GangConfig,
) -> RecruitWeight {
    if role == Role::Police || mood >= config.recruit_mood_threshold {
        return RecruitWeight::None;
    }
    let starvation_line = daily_burn.saturating_mul(config.near_starvation_days);
    if balance < starvation_line {
        RecruitWeight::Double
    } else {
        RecruitWeight::Single
    }
}

/// The registry of all gangs.
#[derive(Debug, Clone, Default)]
pub struct GangRegistry {
    gangs: BTreeMap<GangId, Gang>,
}

impl GangRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            gangs: BTreeMap::new(),
        }
    }

    /// Rebuild from persisted gangs (resume path).
    pub fn from_gangs(gangs: Vec<Gang>) -> Self {
        let mut registry = Self::new();
        for gang in gangs {
            registry.gangs.insert(gang.id, gang);
        }
        registry
    }

    /// Fetch one gang.
    pub fn get(&self, id: GangId) -> Result<&Gang, AgentError> {
        self.gangs.get(&id).ok_or(AgentError::UnknownGang(id))
    }

    /// All gangs.
    pub fn all(&self) -> impl Iterator<Item = &Gang> {
        self.gangs.values()
    }

    /// The active gang an agent belongs to, if any.
    pub fn active_gang_of(&self, agent: AgentId) -> Option<&Gang> {
        self.gangs
            .values()
            .find(|g| g.is_active() && g.members.contains(&agent))
    }

    /// Whether an agent already leads an active gang.
    pub fn leads_active_gang(&self, agent: AgentId) -> bool {
        self.gangs
            .values()
            .any(|g| g.is_active() && g.leader == agent)
    }

    /// The criminal earn multiplier for an agent.
    ///
    /// Leader of an active gang: the leader multiplier. Member: the member
    /// multiplier. Solo criminal or broken gang: 1.0.
    pub fn multiplier(&self, agent: AgentId, config: &GangConfig) -> Decimal {
        self.active_gang_of(agent).map_or(Decimal::ONE, |gang| {
            if gang.leader == agent {
                config.leader_multiplier
            } else {
                config.member_multiplier
            }
        })
    }

    /// Attempt gang formation for a leader with the given recruitable
    /// contacts.
    ///
    /// Requires at least `recruit_target` contacts; a formation roll at the
    /// configured probability either creates the gang or defers to another
    /// day. Returns the new gang id on success.
    pub fn try_form(
        &mut self,
        day: u64,
        leader: AgentId,
        leader_name: &str,
        recruits: &[AgentId],
        config: &GangConfig,
        rng: &mut impl Rng,
    ) -> Option<GangId> {
        if self.leads_active_gang(leader) || self.active_gang_of(leader).is_some() {
            return None;
        }
        if recruits.len() < config.recruit_target {
            return None;
        }
        if !rng.random_bool(config.formation_probability) {
            debug!(day, %leader, "gang formation roll deferred");
            return None;
        }

        let suffix_index = rng.random_range(0..NAME_SUFFIXES.len());
        let suffix = NAME_SUFFIXES.get(suffix_index).copied().unwrap_or("Crew");
        let name = format!("{leader_name}'s {suffix}");

        let mut members: BTreeSet<AgentId> = recruits
            .iter()
            .copied()
            .filter(|recruit| self.active_gang_of(*recruit).is_none())
            .collect();
        members.insert(leader);

        let id = GangId::new();
        info!(day, %id, name = name.as_str(), members = members.len(), "gang formed");
        self.gangs.insert(
            id,
            Gang {
                id,
                name,
                leader,
                members,
                day_formed: day,
                status: GangStatus::Active,
                total_crimes: 0,
                known_to_police: false,
            },
        );
        Some(id)
    }

    /// Count a crime committed by a member of an active gang.
    pub fn record_crime(&mut self, agent: AgentId) {
        if let Some(id) = self.active_gang_of(agent).map(|g| g.id)
            && let Some(gang) = self.gangs.get_mut(&id)
        {
            gang.total_crimes = gang.total_crimes.saturating_add(1);
        }
    }

    /// Run the exposure roll when a gang member is arrested.
    ///
    /// On success the gang becomes known to the police. Returns the exposed
    /// gang's id.
    pub fn on_member_arrest(
        &mut self,
        day: u64,
        agent: AgentId,
        config: &GangConfig,
        rng: &mut impl Rng,
    ) -> Option<GangId> {
        let id = self.active_gang_of(agent).map(|g| g.id)?;
        let gang = self.gangs.get_mut(&id)?;
        if gang.known_to_police || !rng.random_bool(config.exposure_probability) {
            return None;
        }
        gang.known_to_police = true;
        info!(day, %id, "gang exposed to police");
        Some(id)
    }

    /// Break the gang led by a convicted leader.
    ///
    /// All members' criminal multipliers revert to 1.0 immediately (the
    /// multiplier lookup only honors active gangs). Returns the broken
    /// gang's id.
    pub fn on_leader_conviction(&mut self, day: u64, leader: AgentId) -> Option<GangId> {
        let id = self
            .gangs
            .values()
            .find(|g| g.is_active() && g.leader == leader)
            .map(|g| g.id)?;
        if let Some(gang) = self.gangs.get_mut(&id) {
            gang.status = GangStatus::Broken;
            info!(day, %id, "gang broken by leader conviction");
        }
        Some(id)
    }

    /// Gangs changed on the given day (checkpoint delta).
    pub fn changed_on(&self, day: u64) -> Vec<&Gang> {
        self.gangs.values().filter(|g| g.day_formed == day).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn config() -> GangConfig {
        GangConfig {
            formation_probability: 1.0,
            exposure_probability: 1.0,
            ..GangConfig::default()
        }
    }

    #[test]
    fn police_are_never_recruitable() {
        let weight = recruit_weight(
            Role::Police,
            Decimal::NEGATIVE_ONE,
            0,
            10,
            &GangConfig::default(),
        );
        assert_eq!(weight, RecruitWeight::None);
    }

    #[test]
    fn desperation_doubles_weight() {
        let config = GangConfig::default();
        let mood = Decimal::new(-80, 2);
        assert_eq!(
            recruit_weight(Role::Builder, mood, 500, 10, &config),
            RecruitWeight::Single
        );
        // Below two days of burn.
        assert_eq!(
            recruit_weight(Role::Builder, mood, 15, 10, &config),
            RecruitWeight::Double
        );
    }

    #[test]
    fn mood_at_threshold_is_not_recruitable() {
        let config = GangConfig::default();
        assert_eq!(
            recruit_weight(Role::Builder, config.recruit_mood_threshold, 500, 10, &config),
            RecruitWeight::None
        );
    }

    #[test]
    fn formation_needs_enough_recruits() {
        let mut registry = GangRegistry::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let leader = AgentId::new();
        let formed = registry.try_form(7, leader, "Sable", &[AgentId::new()], &config(), &mut rng);
        assert!(formed.is_none());
    }

    #[test]
    fn formation_with_exact_target_succeeds() {
        let mut registry = GangRegistry::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let leader = AgentId::new();
        let recruits = [AgentId::new(), AgentId::new()];
        let id = registry
            .try_form(7, leader, "Sable", &recruits, &config(), &mut rng)
            .unwrap();
        let gang = registry.get(id).unwrap();
        assert_eq!(gang.members.len(), 3);
        assert!(gang.members.contains(&leader));
        assert!(gang.is_active());
    }

    #[test]
    fn multipliers_follow_membership() {
        let mut registry = GangRegistry::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let cfg = config();
        let leader = AgentId::new();
        let member = AgentId::new();
        let outsider = AgentId::new();
        let _ = registry
            .try_form(7, leader, "Sable", &[member, AgentId::new()], &cfg, &mut rng)
            .unwrap();
        assert_eq!(registry.multiplier(leader, &cfg), Decimal::new(14, 1));
        assert_eq!(registry.multiplier(member, &cfg), Decimal::new(12, 1));
        assert_eq!(registry.multiplier(outsider, &cfg), Decimal::ONE);
    }

    #[test]
    fn leader_conviction_breaks_the_gang() {
        let mut registry = GangRegistry::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let cfg = config();
        let leader = AgentId::new();
        let member = AgentId::new();
        let id = registry
            .try_form(7, leader, "Sable", &[member, AgentId::new()], &cfg, &mut rng)
            .unwrap();
        let broken = registry.on_leader_conviction(15, leader).unwrap();
        assert_eq!(broken, id);
        assert_eq!(registry.get(id).unwrap().status, GangStatus::Broken);
        // Multipliers revert immediately.
        assert_eq!(registry.multiplier(member, &cfg), Decimal::ONE);
        assert_eq!(registry.multiplier(leader, &cfg), Decimal::ONE);
    }

    #[test]
    fn member_conviction_does_not_break_the_gang() {
        let mut registry = GangRegistry::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let cfg = config();
        let leader = AgentId::new();
        let member = AgentId::new();
        let _ = registry
            .try_form(7, leader, "Sable", &[member, AgentId::new()], &cfg, &mut rng)
            .unwrap();
        assert!(registry.on_leader_conviction(15, member).is_none());
    }

    #[test]
    fn arrest_exposure_marks_gang_known() {
        let mut registry = GangRegistry::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let cfg = config();
        let leader = AgentId::new();
        let member = AgentId::new();
        let id = registry
            .try_form(7, leader, "Sable", &[member, AgentId::new()], &cfg, &mut rng)
            .unwrap();
        let exposed = registry.on_member_arrest(9, member, &cfg, &mut rng).unwrap();
        assert_eq!(exposed, id);
        assert!(registry.get(id).unwrap().known_to_police);
        // A second arrest cannot expose twice.
        assert!(registry.on_member_arrest(10, member, &cfg, &mut rng).is_none());
    }
}
