//! Tunable behavior, police, and gang parameters.
//!
//! Defaults mirror the documented nominal values; the engine overrides
//! them from the configuration file.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Knobs for the behavior dispatcher.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BehaviorConfig {
    /// Balance below which an agent counts as critical (stress, healer
    /// demand).
    #[serde(default = "default_survival_floor")]
    pub survival_floor: i64,

    /// Daily earnings at or above this queue the strong-earnings mood lift.
    #[serde(default = "default_strong_earn_threshold")]
    pub strong_earn_threshold: i64,

    /// Balance at or above which an agent counts as wealthy (merchant
    /// demand, theft targeting).
    #[serde(default = "default_wealthy_floor")]
    pub wealthy_floor: i64,

    /// Probability a theft attempt succeeds.
    #[serde(default = "default_theft_success")]
    pub theft_success_probability: f64,

    /// Fraction of the victim's balance a theft attempts to take.
    #[serde(default = "default_theft_take_fraction")]
    pub theft_take_fraction: Decimal,

    /// Probability an exploring agent makes a discovery.
    #[serde(default = "default_discovery_probability")]
    pub discovery_probability: f64,

    /// Tokens offered in a bribe.
    #[serde(default = "default_bribe_amount")]
    pub bribe_amount: i64,

    /// Tokens demanded in a blackmail note.
    #[serde(default = "default_blackmail_demand")]
    pub blackmail_demand: i64,

    /// Probability the mark pays a blackmail demand.
    #[serde(default = "default_blackmail_pay_probability")]
    pub blackmail_pay_probability: f64,

    /// Probability an unpaid blackmail ends in the event being reported.
    #[serde(default = "default_blackmail_report_probability")]
    pub blackmail_report_probability: f64,

    /// Comprehension points a day of study earns (doubled by a school).
    #[serde(default = "default_comprehension_gain")]
    pub comprehension_gain: u32,

    /// Comprehension score at which a newborn graduates.
    #[serde(default = "default_graduation_threshold")]
    pub graduation_threshold: u32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            survival_floor: default_survival_floor(),
            strong_earn_threshold: default_strong_earn_threshold(),
            wealthy_floor: default_wealthy_floor(),
            theft_success_probability: default_theft_success(),
            theft_take_fraction: default_theft_take_fraction(),
            discovery_probability: default_discovery_probability(),
            bribe_amount: default_bribe_amount(),
            blackmail_demand: default_blackmail_demand(),
            blackmail_pay_probability: default_blackmail_pay_probability(),
            blackmail_report_probability: default_blackmail_report_probability(),
            comprehension_gain: default_comprehension_gain(),
            graduation_threshold: default_graduation_threshold(),
        }
    }
}

/// Knobs for the police case engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PoliceConfig {
    /// Days without new evidence before an open case goes cold.
    #[serde(default = "default_cold_case_days")]
    pub cold_case_days: u64,

    /// Investigation confidence required to act on an arrest request.
    #[serde(default = "default_arrest_threshold")]
    pub arrest_confidence_threshold: Decimal,

    /// Trial confidence at or above which the verdict is guilty.
    #[serde(default = "default_guilty_threshold")]
    pub trial_guilty_threshold: Decimal,

    /// Probability a patrol scan queues an arrest on a known theft.
    #[serde(default = "default_arrest_scan")]
    pub arrest_scan_probability: f64,

    /// The same scan with a standing watchtower.
    #[serde(default = "default_arrest_scan_watchtower")]
    pub arrest_scan_watchtower_probability: f64,

    /// Susceptibility drift on bribe acceptance (up) and on witnessing a
    /// guilty verdict (down).
    #[serde(default = "default_susceptibility_drift")]
    pub susceptibility_drift: Decimal,

    /// Days of imprisonment on a guilty verdict.
    #[serde(default = "default_sentence_days")]
    pub sentence_days: u64,

    /// Fine collected on a guilty verdict.
    #[serde(default = "default_fine_amount")]
    pub fine_amount: i64,
}

impl Default for PoliceConfig {
    fn default() -> Self {
        Self {
            cold_case_days: default_cold_case_days(),
            arrest_confidence_threshold: default_arrest_threshold(),
            trial_guilty_threshold: default_guilty_threshold(),
            arrest_scan_probability: default_arrest_scan(),
            arrest_scan_watchtower_probability: default_arrest_scan_watchtower(),
            susceptibility_drift: default_susceptibility_drift(),
            sentence_days: default_sentence_days(),
            fine_amount: default_fine_amount(),
        }
    }
}

/// Knobs for the gang system.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GangConfig {
    /// Mood below which a non-police agent is recruitable.
    #[serde(default = "default_recruit_mood_threshold")]
    pub recruit_mood_threshold: Decimal,

    /// Balance under this many days of burn doubles recruit weight.
    #[serde(default = "default_near_starvation_days")]
    pub near_starvation_days: i64,

    /// Recruitable contacts a leader needs before a formation roll.
    #[serde(default = "default_recruit_target")]
    pub recruit_target: usize,

    /// Probability the formation roll succeeds on a given day.
    #[serde(default = "default_formation_probability")]
    pub formation_probability: f64,

    /// Probability an arrest exposes the member's gang.
    #[serde(default = "default_exposure_probability")]
    pub exposure_probability: f64,

    /// Criminal earn multiplier for an active gang's leader.
    #[serde(default = "default_leader_multiplier")]
    pub leader_multiplier: Decimal,

    /// Criminal earn multiplier for an active gang's members.
    #[serde(default = "default_member_multiplier")]
    pub member_multiplier: Decimal,
}

impl Default for GangConfig {
    fn default() -> Self {
        Self {
            recruit_mood_threshold: default_recruit_mood_threshold(),
            near_starvation_days: default_near_starvation_days(),
            recruit_target: default_recruit_target(),
            formation_probability: default_formation_probability(),
            exposure_probability: default_exposure_probability(),
            leader_multiplier: default_leader_multiplier(),
            member_multiplier: default_member_multiplier(),
        }
    }
}

const fn default_survival_floor() -> i64 {
    30
}
const fn default_strong_earn_threshold() -> i64 {
    80
}
const fn default_wealthy_floor() -> i64 {
    1000
}
const fn default_theft_success() -> f64 {
    0.45
}
fn default_theft_take_fraction() -> Decimal {
    Decimal::new(20, 2)
}
const fn default_discovery_probability() -> f64 {
    0.10
}
const fn default_bribe_amount() -> i64 {
    150
}
const fn default_blackmail_demand() -> i64 {
    120
}
const fn default_blackmail_pay_probability() -> f64 {
    0.5
}
const fn default_blackmail_report_probability() -> f64 {
    0.30
}
const fn default_comprehension_gain() -> u32 {
    5
}
const fn default_graduation_threshold() -> u32 {
    100
}
const fn default_cold_case_days() -> u64 {
    14
}
fn default_arrest_threshold() -> Decimal {
    Decimal::new(70, 2)
}
fn default_guilty_threshold() -> Decimal {
    Decimal::new(60, 2)
}
const fn default_arrest_scan() -> f64 {
    0.25
}
const fn default_arrest_scan_watchtower() -> f64 {
    0.30
}
fn default_susceptibility_drift() -> Decimal {
    Decimal::new(5, 2)
}
const fn default_sentence_days() -> u64 {
    5
}
const fn default_fine_amount() -> i64 {
    300
}
fn default_recruit_mood_threshold() -> Decimal {
    Decimal::new(-70, 2)
}
const fn default_near_starvation_days() -> i64 {
    2
}
const fn default_recruit_target() -> usize {
    2
}
const fn default_formation_probability() -> f64 {
    0.30
}
const fn default_exposure_probability() -> f64 {
    0.40
}
fn default_leader_multiplier() -> Decimal {
    Decimal::new(14, 1)
}
fn default_member_multiplier() -> Decimal {
    Decimal::new(12, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_nominals() {
        let behavior = BehaviorConfig::default();
        assert!((behavior.theft_success_probability - 0.45).abs() < f64::EPSILON);

        let police = PoliceConfig::default();
        assert_eq!(police.cold_case_days, 14);
        assert_eq!(police.arrest_confidence_threshold, Decimal::new(70, 2));

        let gang = GangConfig::default();
        assert_eq!(gang.recruit_mood_threshold, Decimal::new(-70, 2));
        assert_eq!(gang.recruit_target, 2);
        assert_eq!(gang.leader_multiplier, Decimal::new(14, 1));
        assert_eq!(gang.member_multiplier, Decimal::new(12, 1));
    }
}
