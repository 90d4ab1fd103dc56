//! The decision facade: packs per-agent context and obtains a decision.
//!
//! The reasoning model sees only what the facade includes. Mood arrives as
//! descriptive text; susceptibility arrives only for police, and only as a
//! framing sentence. On any reasoning failure the facade substitutes the
//! role-default action, logs a warning, and lets the day proceed.

use tracing::warn;

use aicity_social::{BondTable, MemoryStore, mood_text};
use aicity_types::{
    AgentId, BondView, Decision, DecisionContext, InboxView, MessageSender, Role, TimePhase,
    capabilities,
};

use crate::city::City;
use crate::reasoner::ReasoningService;

/// Build the decision context for one agent.
pub fn build_context(city: &City, memory: &dyn MemoryStore, agent: AgentId) -> Option<DecisionContext> {
    let record = city.agents.get(&agent)?;
    let role = record.role;

    let newspaper = city
        .newspaper_for(city.day.saturating_sub(1))
        .map(|s| s.text.clone());

    let asset_flags: Vec<String> = city
        .assets
        .standing()
        .map(|a| format!("the city has a standing {} ({:?})", a.name, a.asset_type))
        .collect();

    let inbox: Vec<InboxView> = city
        .messages
        .inbox(
            agent,
            city.day,
            city.config.social.message_ttl_days,
            city.config.social.inbox_limit,
        )
        .into_iter()
        .map(|m| InboxView {
            from: match m.from {
                MessageSender::Agent(sender) => city
                    .agents
                    .get(&sender)
                    .map_or_else(|| String::from("someone"), |a| a.name.clone()),
                MessageSender::Anon => String::from("someone"),
            },
            day: m.day,
            body: m.body.clone(),
        })
        .collect();

    let annotate = |entries: Vec<(AgentId, rust_decimal::Decimal)>| -> Vec<BondView> {
        entries
            .into_iter()
            .filter_map(|(other, score)| {
                city.agents.get(&other).map(|a| BondView {
                    other: a.name.clone(),
                    annotation: String::from(BondTable::annotate(score)),
                })
            })
            .collect()
    };
    let k = city.config.social.bond_top_k;
    let bonds_positive = annotate(city.bonds.top_positive(agent, k));
    let bonds_negative = annotate(city.bonds.top_negative(agent, k));

    let recall_query = format!("{role:?} day {}", city.day);
    let recalls = memory.recall(agent, &recall_query, city.config.social.recall_k);

    let susceptibility_text = if role == Role::Police {
        record
            .bribe_susceptibility
            .map(|s| String::from(aicity_agents::officer_framing(s)))
    } else {
        None
    };

    Some(DecisionContext {
        day: city.day,
        time_phase: TimePhase::Midday,
        name: record.name.clone(),
        role,
        tokens: city.ledger.balance(agent),
        age_days: record.age_days,
        mood_text: String::from(mood_text(city.moods.get(agent))),
        susceptibility_text,
        comprehension: record.comprehension,
        newspaper,
        asset_flags,
        inbox,
        bonds_positive,
        bonds_negative,
        recalls,
        available_actions: capabilities::for_role(role).allowed.to_vec(),
    })
}

/// Obtain a decision, falling back to the role default on any failure.
pub fn decide_with_fallback(
    reasoner: &mut dyn ReasoningService,
    context: &DecisionContext,
) -> Decision {
    match reasoner.decide(context) {
        Ok(decision) => decision,
        Err(error) => {
            warn!(
                day = context.day,
                agent = context.name.as_str(),
                %error,
                "reasoning call failed, using role default"
            );
            Decision::fallback(context.role)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aicity_social::InMemoryStore;

    use crate::config::SimulationConfig;
    use crate::reasoner::{ReasonError, ScriptedReasoner};

    use super::*;

    struct FailingReasoner;

    impl ReasoningService for FailingReasoner {
        fn decide(
            &mut self,
            _context: &DecisionContext,
        ) -> Result<Decision, ReasonError> {
            Err(ReasonError::Timeout)
        }
        fn judge(
            &mut self,
            _prompt: &aicity_types::CasePrompt,
        ) -> Result<aicity_types::VerdictNote, ReasonError> {
            Err(ReasonError::Timeout)
        }
        fn write_narrative(
            &mut self,
            _request: &aicity_types::NarrativeRequest,
        ) -> Result<String, ReasonError> {
            Err(ReasonError::Timeout)
        }
        fn choose_role(
            &mut self,
            _agent_name: &str,
            _allowed: &[Role],
        ) -> Result<Role, ReasonError> {
            Err(ReasonError::Timeout)
        }
    }

    #[test]
    fn context_shows_mood_as_text_not_numbers() {
        let mut city = City::genesis(SimulationConfig::default());
        let memory = InMemoryStore::new();
        let agent = city.spawn_agent("Ona", Role::Builder).unwrap();
        let context = build_context(&city, &memory, agent).unwrap();
        assert!(!context.mood_text.chars().any(|c| c.is_ascii_digit()));
        assert!(context.susceptibility_text.is_none());
    }

    #[test]
    fn police_context_carries_framing_without_numbers() {
        let mut city = City::genesis(SimulationConfig::default());
        let memory = InMemoryStore::new();
        let officer = city.spawn_agent("Vera", Role::Police).unwrap();
        let context = build_context(&city, &memory, officer).unwrap();
        let framing = context.susceptibility_text.unwrap();
        assert!(!framing.chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn reasoning_failure_degrades_to_role_default() {
        let mut city = City::genesis(SimulationConfig::default());
        let memory = InMemoryStore::new();
        let agent = city.spawn_agent("Sable", Role::Thief).unwrap();
        let context = build_context(&city, &memory, agent).unwrap();
        let mut failing = FailingReasoner;
        let decision = decide_with_fallback(&mut failing, &context);
        assert_eq!(decision.action, aicity_types::ActionKind::Lurk);
    }

    #[test]
    fn scripted_reasoner_flows_through_facade() {
        let mut city = City::genesis(SimulationConfig::default());
        let memory = InMemoryStore::new();
        let agent = city.spawn_agent("Ona", Role::Builder).unwrap();
        let context = build_context(&city, &memory, agent).unwrap();
        let mut reasoner = ScriptedReasoner::new();
        let decision = decide_with_fallback(&mut reasoner, &context);
        assert_eq!(decision.action, aicity_types::ActionKind::Work);
    }
}
