//! The behavior dispatcher: executes one agent's decided action.
//!
//! Every money movement goes through the ledger and every observable act
//! through the event log; the dispatcher itself holds no state. Behavior-
//! level failures (an unresolvable target, a failed theft roll, an empty
//! vault) are recovered locally -- the day never stops because one agent's
//! plan fell through.

use std::collections::BTreeSet;

use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, warn};

use aicity_city::{AssetRegistry, CityMap, ProjectBoard};
use aicity_events::{EventLog, EventScope, NewEvent, PromotionCause};
use aicity_ledger::{Ledger, LedgerError};
use aicity_social::{BondTable, MessageBus, MoodRegister, MoodTrigger};
use aicity_types::{
    ActionKind, AgentId, AgentRecord, AgentStatus, AssetType, CaseStatus, Decision, EventId,
    EventKind, EvidenceRef, HomeLot, MessageSender, Role, Visibility, capabilities,
};

use crate::config::{BehaviorConfig, GangConfig};
use crate::error::AgentError;
use crate::gangs::GangRegistry;
use crate::police::CaseBoard;

/// Everything a turn may read and mutate.
///
/// The scheduler assembles one of these per agent turn; the dispatcher is
/// the only consumer. All references point into the single `City` value --
/// no store is reachable any other way during a turn.
pub struct TurnContext<'a> {
    /// The current day.
    pub day: u64,
    /// The fixed daily burn (used for starvation-distance checks).
    pub daily_burn: i64,
    /// Behavior knobs.
    pub config: &'a BehaviorConfig,
    /// Gang knobs (criminal multipliers).
    pub gang_config: &'a GangConfig,
    /// All agent records.
    pub agents: &'a mut std::collections::BTreeMap<AgentId, AgentRecord>,
    /// The token ledger.
    pub ledger: &'a mut Ledger,
    /// The event log.
    pub events: &'a mut EventLog,
    /// The bond table.
    pub bonds: &'a mut BondTable,
    /// The mood register.
    pub moods: &'a mut MoodRegister,
    /// The message bus.
    pub messages: &'a mut MessageBus,
    /// The project board.
    pub projects: &'a mut ProjectBoard,
    /// The asset registry.
    pub assets: &'a mut AssetRegistry,
    /// The city map.
    pub map: &'a mut CityMap,
    /// The gang registry.
    pub gangs: &'a mut GangRegistry,
    /// The police case board.
    pub cases: &'a mut CaseBoard,
}

/// What one turn did, for the day summary.
#[derive(Debug, Clone, Default)]
pub struct TurnOutcome {
    /// The action actually executed (may be the role default).
    pub action: Option<ActionKind>,
    /// Tokens credited to the actor this turn.
    pub earned: i64,
    /// Events the turn recorded.
    pub events: Vec<EventId>,
    /// Newborns who crossed the graduation threshold this turn.
    pub graduations: Vec<AgentId>,
    /// A home lot claimed this turn.
    pub lot_claimed: Option<HomeLot>,
}

/// Execute one agent's decision.
///
/// Out-of-vocabulary actions are replaced by the role default before
/// dispatch. Returns the turn outcome; behavior-level failures degrade to
/// a quiet day rather than an error.
pub fn execute_turn(
    ctx: &mut TurnContext<'_>,
    rng: &mut impl Rng,
    actor: AgentId,
    decision: &Decision,
) -> Result<TurnOutcome, AgentError> {
    let record = ctx.agents.get(&actor).ok_or(AgentError::UnknownAgent(actor))?;
    if record.status == AgentStatus::Dead {
        return Err(AgentError::AgentDead(actor));
    }
    let role = record.role;

    let action = if capabilities::is_allowed(role, decision.action) {
        decision.action
    } else {
        let fallback = capabilities::default_action(role);
        warn!(day = ctx.day, %actor, requested = ?decision.action, ?fallback, "action outside role vocabulary");
        fallback
    };

    let mut outcome = TurnOutcome {
        action: Some(action),
        ..TurnOutcome::default()
    };

    match action {
        ActionKind::Work | ActionKind::Explore | ActionKind::Patrol | ActionKind::Deliver
        | ActionKind::Defend | ActionKind::Teach | ActionKind::Heal | ActionKind::Study => {
            work_action(ctx, rng, actor, role, action, decision, &mut outcome)?;
        }
        ActionKind::Steal => steal(ctx, rng, actor, decision, &mut outcome)?,
        ActionKind::Blackmail => blackmail(ctx, rng, actor, &mut outcome)?,
        ActionKind::DestroyAsset => destroy_asset(ctx, rng, actor, decision, &mut outcome)?,
        ActionKind::Recruit => recruit(ctx, actor, &mut outcome),
        ActionKind::OfferBribe => offer_bribe(ctx, rng, actor, &mut outcome)?,
        ActionKind::Trade => trade(ctx, rng, actor, decision),
        ActionKind::Report => report_crime(ctx, actor)?,
        ActionKind::ContributeProject => contribute_project(ctx, actor, role, decision),
        ActionKind::StartProject => start_project(ctx, actor, decision),
        ActionKind::ClaimHome => claim_home(ctx, actor, &mut outcome)?,
        ActionKind::SendMessage | ActionKind::Rest | ActionKind::Lurk => {}
    }

    // The decision's message side-channel, unless the action was itself the
    // send (in which case the same fields were already consumed).
    if let (Some(recipient_name), Some(body)) = (&decision.message_to, &decision.message_body) {
        deliver_message(ctx, actor, recipient_name, body);
    }

    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Earning actions
// ---------------------------------------------------------------------------

/// Execute a role's ordinary paid work, including the specialist actions
/// that are really that role's work day (patrol, teach, heal, ...).
#[allow(clippy::too_many_lines)]
fn work_action(
    ctx: &mut TurnContext<'_>,
    rng: &mut impl Rng,
    actor: AgentId,
    role: Role,
    action: ActionKind,
    decision: &Decision,
    outcome: &mut TurnOutcome,
) -> Result<(), AgentError> {
    let caps = capabilities::for_role(role);
    let (low, high) = caps.earn_range;
    let base = if high > low { rng.random_range(low..=high) } else { low };

    let gross = match role {
        Role::Builder => {
            // Desperation language raises the day's take slightly.
            let boosted = if sounds_desperate(&decision.mood_self) {
                base.saturating_add(base.div_euclid(10))
            } else {
                base
            };
            boosted
        }
        Role::Merchant => {
            let wealthy = count_where(ctx, |a, balance| {
                a.is_alive() && balance >= ctx.config.wealthy_floor
            });
            base.saturating_add(wealthy.saturating_mul(5))
        }
        Role::Teacher => {
            let students = count_where(ctx, |a, _| a.is_alive() && a.role.is_student());
            base.saturating_add(students.saturating_mul(10))
        }
        Role::Healer => {
            let critical = count_where(ctx, |a, balance| {
                a.is_alive() && balance < ctx.config.survival_floor
            });
            base.saturating_add(critical.saturating_mul(10))
        }
        Role::Messenger => {
            let alive = count_where(ctx, |a, _| a.is_alive());
            base.saturating_add(alive)
        }
        Role::Lawyer => {
            let open_cases = i64::try_from(ctx.cases.open_cases().len()).unwrap_or(i64::MAX);
            base.saturating_add(open_cases.saturating_mul(15))
        }
        _ => base,
    };

    if gross > 0 {
        match ctx.ledger.earn(ctx.day, actor, gross, work_reason(role)) {
            Ok(earn) => outcome.earned = outcome.earned.saturating_add(earn.credited),
            Err(LedgerError::VaultInsufficient { .. }) => {
                debug!(day = ctx.day, %actor, "vault could not fund wages");
            }
            Err(error) => return Err(error.into()),
        }
    }

    match action {
        ActionKind::Explore => {
            if rng.random_bool(clamp_probability(ctx.config.discovery_probability)) {
                let explorer_name = name_of(ctx, actor);
                let id = ctx.events.record(NewEvent {
                    kind: EventKind::Discovery,
                    actor,
                    target: None,
                    asset: None,
                    description: format!("{explorer_name} found something beyond the city edge"),
                    witnesses: BTreeSet::new(),
                    evidence: Vec::new(),
                });
                outcome.events.push(id);
            }
        }
        ActionKind::Patrol => patrol_scan(ctx, rng, actor)?,
        ActionKind::Teach => teach_students(ctx, actor, outcome),
        ActionKind::Heal => heal_target(ctx, actor, decision, outcome),
        ActionKind::Study => study(ctx, actor, outcome),
        _ => {}
    }

    Ok(())
}

/// The ledger reason string for a role's work.
const fn work_reason(role: Role) -> &'static str {
    match role {
        Role::Builder => "BUILD_WORK",
        Role::Explorer => "EXPEDITION",
        Role::Merchant => "MARKET_SALES",
        Role::Police => "PATROL_PAY",
        Role::Teacher => "TUITION",
        Role::Healer => "CLINIC_FEES",
        Role::Messenger => "COURIER_FEES",
        Role::Lawyer => "LEGAL_FEES",
        Role::Newborn => "STIPEND",
        Role::Thief | Role::GangLeader | Role::Blackmailer | Role::Saboteur => "ODD_JOBS",
    }
}

/// The police patrol scan: roll per known theft toward an arrest.
fn patrol_scan(
    ctx: &mut TurnContext<'_>,
    rng: &mut impl Rng,
    officer: AgentId,
) -> Result<(), AgentError> {
    let probability = if ctx.assets.has_standing(AssetType::Watchtower) {
        ctx.cases.config().arrest_scan_watchtower_probability
    } else {
        ctx.cases.config().arrest_scan_probability
    };
    let probability = clamp_probability(probability);

    let recent_floor = ctx.day.saturating_sub(3);
    let candidates: Vec<(EventId, AgentId, Option<AgentId>)> = ctx
        .events
        .query(&EventScope::Police)
        .into_iter()
        .filter(|e| e.kind == EventKind::Theft && e.day >= recent_floor)
        .map(|e| (e.id, e.actor, e.target))
        .collect();

    for (event, suspect, target) in candidates {
        let linked = ctx.cases.find_by_trigger(event);
        let already_solved = linked
            .and_then(|id| ctx.cases.get(id).ok())
            .is_some_and(|c| c.status == CaseStatus::Solved);
        if already_solved || !rng.random_bool(probability) {
            continue;
        }
        let case = match linked {
            Some(id) => id,
            None => {
                let complainant = target.unwrap_or(officer);
                let id = ctx.cases.open_or_attach(
                    ctx.day,
                    event,
                    complainant,
                    BTreeSet::from([suspect]),
                );
                ctx.events.promote(
                    event,
                    Visibility::Reported,
                    &PromotionCause::Reported {
                        reporter: officer,
                        case: id,
                    },
                )?;
                id
            }
        };
        ctx.cases.add_suspect(case, suspect)?;
        ctx.cases.queue_arrest(ctx.day, case, suspect);
    }
    Ok(())
}

/// Raise every student's comprehension; collect graduations.
fn teach_students(ctx: &mut TurnContext<'_>, teacher: AgentId, outcome: &mut TurnOutcome) {
    let gain = comprehension_gain(ctx);
    let threshold = ctx.config.graduation_threshold;
    let students: Vec<AgentId> = ctx
        .agents
        .values()
        .filter(|a| a.is_alive() && a.role.is_student())
        .map(|a| a.id)
        .collect();

    for student in students {
        if let Some(record) = ctx.agents.get_mut(&student) {
            record.assigned_teacher.get_or_insert(teacher);
            let before = record.comprehension.unwrap_or(0);
            let after = before.saturating_add(gain).min(100);
            record.comprehension = Some(after);
            if before < threshold && after >= threshold {
                outcome.graduations.push(student);
            }
        }
        ctx.bonds
            .apply(teacher, student, aicity_social::delta_cooperative(), ctx.day);
    }
}

/// A newborn's own study day.
fn study(ctx: &mut TurnContext<'_>, student: AgentId, outcome: &mut TurnOutcome) {
    let gain = comprehension_gain(ctx);
    let threshold = ctx.config.graduation_threshold;
    let teacher = ctx
        .agents
        .values()
        .find(|a| a.is_alive() && a.role == Role::Teacher)
        .map(|a| a.id);
    if let Some(record) = ctx.agents.get_mut(&student) {
        if record.assigned_teacher.is_none() {
            record.assigned_teacher = teacher;
        }
        let before = record.comprehension.unwrap_or(0);
        let after = before.saturating_add(gain).min(100);
        record.comprehension = Some(after);
        if before < threshold && after >= threshold {
            outcome.graduations.push(student);
        }
    }
}

/// Comprehension gain per day, doubled by a standing school.
fn comprehension_gain(ctx: &TurnContext<'_>) -> u32 {
    let base = ctx.config.comprehension_gain;
    if ctx.assets.has_standing(AssetType::School) {
        base.saturating_mul(2)
    } else {
        base
    }
}

/// Heal the named target, or the most critical agent if none resolves.
fn heal_target(
    ctx: &mut TurnContext<'_>,
    healer: AgentId,
    decision: &Decision,
    outcome: &mut TurnOutcome,
) {
    let named = decision
        .target
        .as_deref()
        .and_then(|name| resolve_agent(ctx, name));
    let patient = named.or_else(|| {
        ctx.agents
            .values()
            .filter(|a| a.takes_turn() && a.id != healer)
            .min_by_key(|a| ctx.ledger.balance(a.id))
            .map(|a| a.id)
    });
    let Some(patient) = patient else { return };

    ctx.moods.queue(patient, MoodTrigger::Healed);
    ctx.bonds
        .apply(healer, patient, aicity_social::delta_cooperative(), ctx.day);
    let healer_name = name_of(ctx, healer);
    let patient_name = name_of(ctx, patient);
    let id = ctx.events.record(NewEvent {
        kind: EventKind::Heal,
        actor: healer,
        target: Some(patient),
        asset: None,
        description: format!("{healer_name} treated {patient_name}"),
        witnesses: BTreeSet::new(),
        evidence: Vec::new(),
    });
    outcome.events.push(id);
}

// ---------------------------------------------------------------------------
// Criminal actions
// ---------------------------------------------------------------------------

/// Attempt a theft against the decided or auto-selected target.
fn steal(
    ctx: &mut TurnContext<'_>,
    rng: &mut impl Rng,
    thief: AgentId,
    decision: &Decision,
    outcome: &mut TurnOutcome,
) -> Result<(), AgentError> {
    let named = decision
        .target
        .as_deref()
        .and_then(|name| resolve_agent(ctx, name))
        .filter(|candidate| theft_target_eligible(ctx, thief, *candidate));
    let Some(victim) = named.or_else(|| pick_theft_target(ctx, thief)) else {
        debug!(day = ctx.day, %thief, "no viable theft target");
        return Ok(());
    };

    if !rng.random_bool(clamp_probability(ctx.config.theft_success_probability)) {
        // Failed attempts are not emitted; nothing observable happened.
        debug!(day = ctx.day, %thief, %victim, "theft attempt failed");
        return Ok(());
    }

    let multiplier = ctx.gangs.multiplier(thief, ctx.gang_config);
    let take = Decimal::from(ctx.ledger.balance(victim))
        .saturating_mul(ctx.config.theft_take_fraction)
        .saturating_mul(multiplier)
        .floor()
        .to_i64()
        .unwrap_or(0);
    if take <= 0 {
        return Ok(());
    }

    let moved = match ctx.ledger.transfer(ctx.day, victim, thief, take, "THEFT") {
        Ok(moved) => moved,
        Err(LedgerError::TransferBelowFloor { .. }) => return Ok(()),
        Err(error) => return Err(error.into()),
    };
    outcome.earned = outcome.earned.saturating_add(moved);

    ctx.gangs.record_crime(thief);
    ctx.moods.queue(victim, MoodTrigger::TheftVictim);
    ctx.bonds
        .apply(thief, victim, aicity_social::delta_antagonistic(), ctx.day);

    let tx_evidence: Vec<EvidenceRef> = ctx
        .ledger
        .transactions()
        .last()
        .map(|t| EvidenceRef::Transaction(t.id))
        .into_iter()
        .collect();
    let victim_name = name_of(ctx, victim);
    let id = ctx.events.record(NewEvent {
        kind: EventKind::Theft,
        actor: thief,
        target: Some(victim),
        asset: None,
        description: format!("{moved} tokens stolen from {victim_name}"),
        witnesses: BTreeSet::new(),
        evidence: tx_evidence,
    });
    outcome.events.push(id);
    Ok(())
}

/// Whether an agent can be robbed.
fn theft_target_eligible(ctx: &TurnContext<'_>, thief: AgentId, candidate: AgentId) -> bool {
    candidate != thief
        && ctx.agents.get(&candidate).is_some_and(|a| {
            a.status == AgentStatus::Alive && a.role != Role::Newborn
        })
}

/// Rank targets by wealth discounted by bond warmth.
fn pick_theft_target(ctx: &TurnContext<'_>, thief: AgentId) -> Option<AgentId> {
    ctx.agents
        .values()
        .filter(|a| theft_target_eligible(ctx, thief, a.id))
        .map(|a| {
            let wealth = Decimal::from(ctx.ledger.balance(a.id));
            let warmth = ctx.bonds.get(thief, a.id);
            // A warm bond shields a mark; a grudge sweetens one.
            let appeal = wealth.saturating_mul(Decimal::ONE.saturating_sub(warmth));
            (a.id, appeal)
        })
        .filter(|(_, appeal)| *appeal > Decimal::ZERO)
        .max_by(|x, y| x.1.cmp(&y.1))
        .map(|(id, _)| id)
}

/// Demand payment for silence over an event the blackmailer knows about.
fn blackmail(
    ctx: &mut TurnContext<'_>,
    rng: &mut impl Rng,
    blackmailer: AgentId,
    outcome: &mut TurnOutcome,
) -> Result<(), AgentError> {
    // A usable secret: the blackmailer knows it, did not do it, and the
    // city does not.
    let secret = ctx
        .events
        .all()
        .filter(|e| {
            e.visibility < Visibility::Public
                && e.actor != blackmailer
                && e.knowers.contains(&blackmailer)
        })
        .map(|e| (e.id, e.actor))
        .next_back();
    let Some((secret_event, mark)) = secret else {
        return Ok(());
    };
    if ctx.agents.get(&mark).is_none_or(|a| !a.takes_turn()) {
        return Ok(());
    }

    let message = ctx.messages.send(
        ctx.day,
        MessageSender::Anon,
        mark,
        "I know what you did. Pay, or the city hears about it.",
    );

    let demand = ctx.config.blackmail_demand;
    if rng.random_bool(clamp_probability(ctx.config.blackmail_pay_probability)) {
        let moved = match ctx.ledger.transfer(ctx.day, mark, blackmailer, demand, "HUSH_MONEY") {
            Ok(moved) => moved,
            Err(LedgerError::TransferBelowFloor { .. }) => 0,
            Err(error) => return Err(error.into()),
        };
        outcome.earned = outcome.earned.saturating_add(moved);
        ctx.gangs.record_crime(blackmailer);
        ctx.bonds
            .apply(blackmailer, mark, aicity_social::delta_antagonistic(), ctx.day);
        let mark_name = name_of(ctx, mark);
        let id = ctx.events.record(NewEvent {
            kind: EventKind::Blackmail,
            actor: blackmailer,
            target: Some(mark),
            asset: None,
            description: format!("{mark_name} paid for someone's silence"),
            witnesses: BTreeSet::new(),
            evidence: vec![EvidenceRef::Message(message)],
        });
        outcome.events.push(id);
    } else if rng.random_bool(clamp_probability(ctx.config.blackmail_report_probability)) {
        // Non-payment: the blackmailer makes good on the threat.
        let case = ctx.cases.open_or_attach(
            ctx.day,
            secret_event,
            blackmailer,
            BTreeSet::from([mark]),
        );
        ctx.events.promote(
            secret_event,
            Visibility::Reported,
            &PromotionCause::Reported {
                reporter: blackmailer,
                case,
            },
        )?;
    }
    Ok(())
}

/// Destroy a standing asset, leaving scattered clues.
fn destroy_asset(
    ctx: &mut TurnContext<'_>,
    rng: &mut impl Rng,
    saboteur: AgentId,
    decision: &Decision,
    outcome: &mut TurnOutcome,
) -> Result<(), AgentError> {
    let named = decision
        .target
        .as_deref()
        .and_then(|name| ctx.assets.standing_by_name(name))
        .map(|a| a.id);
    let target = named.or_else(|| {
        let standing: Vec<_> = ctx.assets.standing().map(|a| a.id).collect();
        if standing.is_empty() {
            None
        } else {
            let index = rng.random_range(0..standing.len());
            standing.get(index).copied()
        }
    });
    let Some(asset_id) = target else { return Ok(()) };

    let asset = ctx.assets.destroy(ctx.day, asset_id)?;
    let asset_name = asset.name.clone();
    ctx.map.remove_tile_of(asset_id);
    ctx.gangs.record_crime(saboteur);

    // Everyone alive except the saboteur feels the loss.
    let grieving: Vec<AgentId> = ctx
        .agents
        .values()
        .filter(|a| a.is_alive() && a.id != saboteur)
        .map(|a| a.id)
        .collect();
    for agent in grieving {
        ctx.moods.queue(agent, MoodTrigger::AssetDestroyed);
    }

    let clues = [
        "toolmarks no honest trade would leave",
        "a scrap of gray cloth caught on a nail",
        "footprints leading toward the east quarter",
    ];
    let clue_index = rng.random_range(0..clues.len());
    let clue = clues.get(clue_index).copied().unwrap_or("scattered debris");

    let id = ctx.events.record(NewEvent {
        kind: EventKind::Sabotage,
        actor: saboteur,
        target: None,
        asset: Some(asset_id),
        description: format!("{asset_name} was found destroyed"),
        witnesses: BTreeSet::new(),
        evidence: vec![EvidenceRef::Clue(String::from(clue))],
    });
    outcome.events.push(id);
    Ok(())
}

/// Court recruitable contacts with a recruiting message.
fn recruit(ctx: &mut TurnContext<'_>, leader: AgentId, _outcome: &mut TurnOutcome) {
    let config = ctx.gang_config;
    let recruitable: Vec<AgentId> = ctx
        .agents
        .values()
        .filter(|a| a.takes_turn() && a.id != leader)
        .filter(|a| {
            crate::gangs::recruit_weight(
                a.role,
                ctx.moods.get(a.id),
                ctx.ledger.balance(a.id),
                ctx.daily_burn,
                config,
            ) != crate::gangs::RecruitWeight::None
        })
        .map(|a| a.id)
        .collect();

    for candidate in recruitable {
        let _ = ctx.messages.send(
            ctx.day,
            MessageSender::Agent(leader),
            candidate,
            "The city gave up on you. I have not. Work with me and eat well.",
        );
        ctx.bonds
            .apply(leader, candidate, aicity_social::delta_cooperative(), ctx.day);
    }
}

/// Pay a police officer to look away.
fn offer_bribe(
    ctx: &mut TurnContext<'_>,
    rng: &mut impl Rng,
    briber: AgentId,
    outcome: &mut TurnOutcome,
) -> Result<(), AgentError> {
    let officers: Vec<AgentId> = ctx
        .agents
        .values()
        .filter(|a| a.takes_turn() && a.role == Role::Police)
        .map(|a| a.id)
        .collect();
    if officers.is_empty() {
        return Ok(());
    }
    let index = rng.random_range(0..officers.len());
    let Some(&officer) = officers.get(index) else {
        return Ok(());
    };

    let moved = match ctx.ledger.transfer(ctx.day, briber, officer, ctx.config.bribe_amount, "BRIBE") {
        Ok(moved) => moved,
        Err(LedgerError::TransferBelowFloor { .. }) => return Ok(()),
        Err(error) => return Err(error.into()),
    };

    let tx_evidence: Vec<EvidenceRef> = ctx
        .ledger
        .transactions()
        .last()
        .map(|t| EvidenceRef::Transaction(t.id))
        .into_iter()
        .collect();
    let id = ctx.events.record(NewEvent {
        kind: EventKind::Bribe,
        actor: briber,
        target: Some(officer),
        asset: None,
        description: format!("{moved} tokens changed hands in a quiet doorway"),
        witnesses: BTreeSet::new(),
        evidence: tx_evidence,
    });
    outcome.events.push(id);
    Ok(())
}

// ---------------------------------------------------------------------------
// Civic actions
// ---------------------------------------------------------------------------

/// A small goodwill trade with the named target.
fn trade(ctx: &mut TurnContext<'_>, rng: &mut impl Rng, actor: AgentId, decision: &Decision) {
    let Some(partner) = decision
        .target
        .as_deref()
        .and_then(|name| resolve_agent(ctx, name))
        .filter(|p| *p != actor)
    else {
        return;
    };
    let amount = rng.random_range(10..=50);
    if ctx.ledger.transfer(ctx.day, actor, partner, amount, "TRADE").is_ok() {
        ctx.bonds
            .apply(actor, partner, aicity_social::delta_cooperative(), ctx.day);
    }
}

/// Report the most recent crime the reporter personally knows about.
///
/// A first report opens a case and promotes the event; a report against
/// an already-reported event attaches the new account as evidence, which
/// reopens a cold case.
fn report_crime(ctx: &mut TurnContext<'_>, reporter: AgentId) -> Result<(), AgentError> {
    let reportable = ctx
        .events
        .all()
        .filter(|e| {
            is_crime(e.kind)
                && e.actor != reporter
                && e.visibility < Visibility::Public
                && (e.target == Some(reporter) || e.witnesses.contains(&reporter))
        })
        .map(|e| (e.id, e.actor, e.case))
        .next_back();
    let Some((event, suspect, linked)) = reportable else {
        return Ok(());
    };

    if let Some(case) = linked {
        let solved = ctx
            .cases
            .get(case)
            .is_ok_and(|c| c.status == CaseStatus::Solved);
        if !solved {
            let _ = ctx.cases.attach_evidence(
                ctx.day,
                case,
                EvidenceRef::Clue(String::from("a new witness account")),
            )?;
        }
        return Ok(());
    }

    let case = ctx
        .cases
        .open_or_attach(ctx.day, event, reporter, BTreeSet::from([suspect]));
    ctx.events.promote(
        event,
        Visibility::Reported,
        &PromotionCause::Reported {
            reporter,
            case,
        },
    )?;
    Ok(())
}

/// Event kinds the police take reports about.
const fn is_crime(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::Theft
            | EventKind::Arson
            | EventKind::Assault
            | EventKind::Blackmail
            | EventKind::Sabotage
            | EventKind::Bribe
    )
}

/// Put the day into an active project.
fn contribute_project(
    ctx: &mut TurnContext<'_>,
    actor: AgentId,
    role: Role,
    decision: &Decision,
) {
    let named = decision.target.as_deref().and_then(|name| {
        ctx.projects
            .active()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.id)
    });
    let project = named.or_else(|| ctx.projects.active().map(|p| p.id).next());
    if let Some(project) = project {
        let _ = ctx.projects.stage_contribution(project, actor, role);
    }
}

/// Propose a new project.
fn start_project(ctx: &mut TurnContext<'_>, proposer: AgentId, decision: &Decision) {
    let asset_type = decision
        .target
        .as_deref()
        .and_then(parse_asset_type)
        .unwrap_or(AssetType::Market);
    // One active project per type keeps proposals from piling up.
    if ctx.projects.active_of_type(asset_type).is_some() {
        return;
    }
    let blueprint = aicity_city::blueprint(asset_type);
    let tile = blueprint
        .has_tile_footprint
        .then(|| ctx.map.free_asset_position());
    let name = format!("{} {:?}", name_of(ctx, proposer), asset_type).to_lowercase();
    let _ = ctx.projects.start(ctx.day, name, asset_type, proposer, tile);
}

/// Parse an asset type from decision free text.
fn parse_asset_type(text: &str) -> Option<AssetType> {
    let lower = text.to_lowercase();
    [
        ("market", AssetType::Market),
        ("watchtower", AssetType::Watchtower),
        ("hospital", AssetType::Hospital),
        ("school", AssetType::School),
        ("road", AssetType::Road),
        ("archive", AssetType::Archive),
    ]
    .into_iter()
    .find(|(keyword, _)| lower.contains(keyword))
    .map(|(_, asset_type)| asset_type)
}

/// Claim a free home lot.
fn claim_home(
    ctx: &mut TurnContext<'_>,
    actor: AgentId,
    outcome: &mut TurnOutcome,
) -> Result<(), AgentError> {
    let lot = match ctx.map.claim_lot(ctx.day, actor) {
        Ok(lot) => lot,
        Err(aicity_city::CityError::LotAlreadyClaimed(_)) => return Ok(()),
        Err(error) => return Err(error.into()),
    };
    if let Some(record) = ctx.agents.get_mut(&actor) {
        record.home_lot = Some(lot.id);
        record.position = Some(lot.tile);
    }
    let claimant_name = name_of(ctx, actor);
    let id = ctx.events.record(NewEvent {
        kind: EventKind::HomeClaimed,
        actor,
        target: None,
        asset: None,
        description: format!("{claimant_name} claimed a home lot"),
        witnesses: BTreeSet::new(),
        evidence: Vec::new(),
    });
    ctx.events.promote(id, Visibility::Public, &PromotionCause::Publication)?;
    outcome.events.push(id);
    outcome.lot_claimed = Some(lot);
    Ok(())
}

/// Deliver the decision's outgoing message and run the rumor scan.
fn deliver_message(ctx: &mut TurnContext<'_>, sender: AgentId, recipient_name: &str, body: &str) {
    let Some(recipient) = resolve_agent(ctx, recipient_name).filter(|r| *r != sender) else {
        return;
    };
    let message = ctx
        .messages
        .send(ctx.day, MessageSender::Agent(sender), recipient, body);
    ctx.bonds
        .apply(sender, recipient, aicity_social::delta_cooperative(), ctx.day);

    // A knower writing about an event spreads it: witnessed -> rumor.
    let lower = body.to_lowercase();
    let recent_floor = ctx.day.saturating_sub(3);
    let mentioned: Vec<EventId> = ctx
        .events
        .all()
        .filter(|e| {
            e.day >= recent_floor
                && e.visibility < Visibility::Public
                && e.knowers.contains(&sender)
                && kind_keywords(e.kind).iter().any(|k| lower.contains(k))
        })
        .map(|e| e.id)
        .collect();
    for event in mentioned {
        let _ = ctx.events.note_mention(event, message, recipient);
    }
}

/// Words that count as talking about an event kind.
const fn kind_keywords(kind: EventKind) -> &'static [&'static str] {
    match kind {
        EventKind::Theft => &["theft", "stole", "stolen", "robbed"],
        EventKind::Arson => &["fire", "arson", "burned"],
        EventKind::Assault => &["attack", "assault", "beaten"],
        EventKind::Bribe => &["bribe", "paid off"],
        EventKind::Blackmail => &["blackmail", "extort"],
        EventKind::Sabotage => &["sabotage", "destroyed", "wrecked"],
        EventKind::Discovery => &["found", "discovery"],
        _ => &[],
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Resolve a display name to an alive agent.
fn resolve_agent(ctx: &TurnContext<'_>, name: &str) -> Option<AgentId> {
    ctx.agents
        .values()
        .find(|a| a.is_alive() && a.name.eq_ignore_ascii_case(name))
        .map(|a| a.id)
}

/// An agent's display name, or a placeholder for the departed.
fn name_of(ctx: &TurnContext<'_>, agent: AgentId) -> String {
    ctx.agents
        .get(&agent)
        .map_or_else(|| String::from("someone"), |a| a.name.clone())
}

/// Count agents matching a predicate over (record, balance).
fn count_where(
    ctx: &TurnContext<'_>,
    predicate: impl Fn(&AgentRecord, i64) -> bool,
) -> i64 {
    let count = ctx
        .agents
        .values()
        .filter(|a| predicate(a, ctx.ledger.balance(a.id)))
        .count();
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Whether self-described mood reads as desperation.
fn sounds_desperate(mood_self: &str) -> bool {
    let lower = mood_self.to_lowercase();
    ["desperate", "starving", "nothing left", "last chance"]
        .iter()
        .any(|phrase| lower.contains(phrase))
}

/// Keep a configured probability usable by the rng.
fn clamp_probability(p: f64) -> f64 {
    p.clamp(0.0, 1.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use aicity_ledger::LedgerPolicy;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use crate::config::PoliceConfig;
    use crate::factory;

    use super::*;

    struct Fixture {
        agents: BTreeMap<AgentId, AgentRecord>,
        ledger: Ledger,
        events: EventLog,
        bonds: BondTable,
        moods: MoodRegister,
        messages: MessageBus,
        projects: ProjectBoard,
        assets: AssetRegistry,
        map: CityMap,
        gangs: GangRegistry,
        cases: CaseBoard,
        behavior: BehaviorConfig,
        gang: GangConfig,
        next_seed: u64,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                agents: BTreeMap::new(),
                ledger: Ledger::genesis(1_000_000, "key", LedgerPolicy::default()),
                events: EventLog::new(),
                bonds: BondTable::new(),
                moods: MoodRegister::new(),
                messages: MessageBus::new(),
                projects: ProjectBoard::new(),
                assets: AssetRegistry::new(),
                map: CityMap::new(),
                gangs: GangRegistry::new(),
                cases: CaseBoard::new(PoliceConfig::default()),
                behavior: BehaviorConfig::default(),
                gang: GangConfig::default(),
                next_seed: 1,
            }
        }

        fn add(&mut self, name: &str, role: Role, balance: i64) -> AgentId {
            let mut rng = SmallRng::seed_from_u64(self.next_seed);
            self.next_seed += 1;
            let record = factory::spawn(name, role, 0, &mut rng);
            let id = record.id;
            self.ledger.register(0, id, balance).unwrap();
            self.agents.insert(id, record);
            id
        }

        fn ctx(&mut self, day: u64) -> TurnContext<'_> {
            self.events.begin_day(day);
            TurnContext {
                day,
                daily_burn: 10,
                config: &self.behavior,
                gang_config: &self.gang,
                agents: &mut self.agents,
                ledger: &mut self.ledger,
                events: &mut self.events,
                bonds: &mut self.bonds,
                moods: &mut self.moods,
                messages: &mut self.messages,
                projects: &mut self.projects,
                assets: &mut self.assets,
                map: &mut self.map,
                gangs: &mut self.gangs,
                cases: &mut self.cases,
            }
        }
    }

    fn decide(action: ActionKind) -> Decision {
        Decision {
            action,
            target: None,
            message_to: None,
            message_body: None,
            mood_self: String::from("steady"),
            rationale: String::from("test"),
        }
    }

    #[test]
    fn builder_work_earns_within_reach() {
        let mut fixture = Fixture::new();
        let builder = fixture.add("Ona", Role::Builder, 1000);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut ctx = fixture.ctx(1);
        let outcome = execute_turn(&mut ctx, &mut rng, builder, &decide(ActionKind::Work)).unwrap();
        assert!(outcome.earned > 0);
        assert!(fixture.ledger.balance(builder) > 1000);
    }

    #[test]
    fn out_of_vocabulary_action_falls_back_to_default() {
        let mut fixture = Fixture::new();
        let builder = fixture.add("Ona", Role::Builder, 1000);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut ctx = fixture.ctx(1);
        // Builders cannot steal; the dispatcher substitutes Work.
        let outcome =
            execute_turn(&mut ctx, &mut rng, builder, &decide(ActionKind::Steal)).unwrap();
        assert_eq!(outcome.action, Some(ActionKind::Work));
    }

    #[test]
    fn successful_theft_moves_tokens_and_logs_private_event() {
        let mut fixture = Fixture::new();
        fixture.behavior.theft_success_probability = 1.0;
        let thief = fixture.add("Sable", Role::Thief, 100);
        let victim = fixture.add("Marta", Role::Merchant, 2000);
        let mut rng = SmallRng::seed_from_u64(2);
        let mut ctx = fixture.ctx(3);
        let outcome =
            execute_turn(&mut ctx, &mut rng, thief, &decide(ActionKind::Steal)).unwrap();
        assert!(outcome.earned > 0);
        assert!(fixture.ledger.balance(thief) > 100);
        assert!(fixture.ledger.balance(victim) < 2000);
        let event = fixture.events.get(*outcome.events.first().unwrap()).unwrap();
        assert_eq!(event.kind, EventKind::Theft);
        assert_eq!(event.visibility, Visibility::Private);
        assert_eq!(event.target, Some(victim));
    }

    #[test]
    fn thieves_spare_newborns() {
        let mut fixture = Fixture::new();
        let thief = fixture.add("Sable", Role::Thief, 100);
        let _newborn = fixture.add("Pip", Role::Newborn, 5000);
        let mut rng = SmallRng::seed_from_u64(2);
        for _ in 0..20 {
            let mut ctx = fixture.ctx(3);
            let outcome =
                execute_turn(&mut ctx, &mut rng, thief, &decide(ActionKind::Steal)).unwrap();
            assert_eq!(outcome.earned, 0);
        }
    }

    #[test]
    fn heal_lifts_the_patient_mood() {
        let mut fixture = Fixture::new();
        let healer = fixture.add("Ruta", Role::Healer, 500);
        let patient = fixture.add("Ona", Role::Builder, 60);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut ctx = fixture.ctx(1);
        let outcome = execute_turn(&mut ctx, &mut rng, healer, &decide(ActionKind::Heal)).unwrap();
        assert!(!outcome.events.is_empty());
        let changed = fixture.moods.apply_day();
        assert!(changed.iter().any(|(id, mood)| *id == patient && *mood > Decimal::ZERO));
    }

    #[test]
    fn teaching_accrues_comprehension_and_graduates() {
        let mut fixture = Fixture::new();
        fixture.behavior.graduation_threshold = 10;
        let teacher = fixture.add("Mirel", Role::Teacher, 500);
        let newborn = fixture.add("Pip", Role::Newborn, 500);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut graduated = false;
        for day in 1..=3 {
            let mut ctx = fixture.ctx(day);
            let outcome =
                execute_turn(&mut ctx, &mut rng, teacher, &decide(ActionKind::Teach)).unwrap();
            if outcome.graduations.contains(&newborn) {
                graduated = true;
            }
        }
        assert!(graduated);
        assert_eq!(
            fixture.agents.get(&newborn).unwrap().assigned_teacher,
            Some(teacher)
        );
    }

    #[test]
    fn school_doubles_comprehension_gain() {
        let mut fixture = Fixture::new();
        let _ = fixture
            .assets
            .register(0, "school", AssetType::School, Vec::new(), None);
        let newborn = fixture.add("Pip", Role::Newborn, 500);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut ctx = fixture.ctx(1);
        let _ = execute_turn(&mut ctx, &mut rng, newborn, &decide(ActionKind::Study)).unwrap();
        assert_eq!(fixture.agents.get(&newborn).unwrap().comprehension, Some(10));
    }

    #[test]
    fn sabotage_destroys_and_saddens_the_city() {
        let mut fixture = Fixture::new();
        let saboteur = fixture.add("Grim", Role::Saboteur, 500);
        let bystander = fixture.add("Ona", Role::Builder, 500);
        let asset =
            fixture
                .assets
                .register(0, "market", AssetType::Market, Vec::new(), None);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut ctx = fixture.ctx(2);
        let outcome =
            execute_turn(&mut ctx, &mut rng, saboteur, &decide(ActionKind::DestroyAsset)).unwrap();
        assert!(!fixture.assets.has_standing(AssetType::Market));
        let event = fixture.events.get(*outcome.events.first().unwrap()).unwrap();
        assert_eq!(event.kind, EventKind::Sabotage);
        assert_eq!(event.asset, Some(asset));
        assert!(!event.evidence.is_empty());
        let changed = fixture.moods.apply_day();
        assert!(changed.iter().any(|(id, _)| *id == bystander));
        assert!(changed.iter().all(|(id, _)| *id != saboteur));
    }

    #[test]
    fn report_opens_a_case_and_promotes_the_event() {
        let mut fixture = Fixture::new();
        let thief = fixture.add("Sable", Role::Thief, 100);
        let victim = fixture.add("Marta", Role::Merchant, 2000);
        // Record a theft the victim knows about.
        fixture.events.begin_day(3);
        let event = fixture.events.record(NewEvent {
            kind: EventKind::Theft,
            actor: thief,
            target: Some(victim),
            asset: None,
            description: String::from("tokens gone"),
            witnesses: BTreeSet::from([victim]),
            evidence: Vec::new(),
        });
        let mut rng = SmallRng::seed_from_u64(3);
        let mut ctx = fixture.ctx(4);
        let _ = execute_turn(&mut ctx, &mut rng, victim, &decide(ActionKind::Report)).unwrap();
        let stored = fixture.events.get(event).unwrap();
        assert_eq!(stored.visibility, Visibility::Reported);
        let case = fixture.cases.find_by_trigger(event).unwrap();
        assert!(fixture.cases.get(case).unwrap().suspects.contains(&thief));
    }

    #[test]
    fn message_mention_spreads_a_witnessed_event() {
        let mut fixture = Fixture::new();
        let thief = fixture.add("Sable", Role::Thief, 100);
        let victim = fixture.add("Marta", Role::Merchant, 2000);
        let confidant = fixture.add("Ona", Role::Builder, 500);
        fixture.events.begin_day(3);
        let event = fixture.events.record(NewEvent {
            kind: EventKind::Theft,
            actor: thief,
            target: Some(victim),
            asset: None,
            description: String::from("tokens gone"),
            witnesses: BTreeSet::from([victim]),
            evidence: Vec::new(),
        });
        let mut rng = SmallRng::seed_from_u64(3);
        let mut ctx = fixture.ctx(4);
        let mut decision = decide(ActionKind::SendMessage);
        decision.message_to = Some(String::from("Ona"));
        decision.message_body = Some(String::from("Someone stole from me at the stalls."));
        let _ = execute_turn(&mut ctx, &mut rng, victim, &decision).unwrap();
        let stored = fixture.events.get(event).unwrap();
        assert_eq!(stored.visibility, Visibility::Rumor);
        assert!(stored.knowers.contains(&confidant));
    }

    #[test]
    fn claim_home_sets_record_and_publishes() {
        let mut fixture = Fixture::new();
        let builder = fixture.add("Ona", Role::Builder, 500);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut ctx = fixture.ctx(1);
        let outcome =
            execute_turn(&mut ctx, &mut rng, builder, &decide(ActionKind::ClaimHome)).unwrap();
        assert!(outcome.lot_claimed.is_some());
        let record = fixture.agents.get(&builder).unwrap();
        assert!(record.home_lot.is_some());
        let event = fixture.events.get(*outcome.events.first().unwrap()).unwrap();
        assert_eq!(event.visibility, Visibility::Public);
    }

    #[test]
    fn patrol_scan_queues_an_arrest_on_a_witnessed_theft() {
        let mut fixture = Fixture::new();
        fixture.cases = CaseBoard::new(PoliceConfig {
            arrest_scan_probability: 1.0,
            ..PoliceConfig::default()
        });
        let officer = fixture.add("Vera", Role::Police, 500);
        let thief = fixture.add("Sable", Role::Thief, 100);
        let victim = fixture.add("Marta", Role::Merchant, 2000);
        fixture.events.begin_day(3);
        let event = fixture.events.record(NewEvent {
            kind: EventKind::Theft,
            actor: thief,
            target: Some(victim),
            asset: None,
            description: String::from("tokens gone"),
            witnesses: BTreeSet::from([victim]),
            evidence: Vec::new(),
        });
        let mut rng = SmallRng::seed_from_u64(3);
        let mut ctx = fixture.ctx(4);
        let _ = execute_turn(&mut ctx, &mut rng, officer, &decide(ActionKind::Patrol)).unwrap();
        let arrests = fixture.cases.take_arrests();
        assert_eq!(arrests.len(), 1);
        assert_eq!(arrests.first().unwrap().suspect, thief);
        // The scan reported the event on its way to the arrest queue.
        assert_eq!(
            fixture.events.get(event).unwrap().visibility,
            Visibility::Reported
        );
    }
}
