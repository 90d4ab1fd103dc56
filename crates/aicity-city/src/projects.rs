//! The project board: multi-day collaborative builds.
//!
//! Contributions are staged during per-agent turns and settled once by the
//! scheduler at the end of the day: a day with the full required crew adds
//! 1.0 progress, a partial crew adds 0.5, and a day with nobody on site
//! advances the abandonment counter.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::{debug, info};

use aicity_types::{AgentId, AssetType, Project, ProjectId, ProjectStatus, Role, TilePos};

use crate::catalog::{self, ProjectBlueprint};
use crate::error::CityError;

/// Progress added by a full-crew day.
fn full_day() -> Decimal {
    Decimal::ONE
}

/// Progress added by a partial-crew day.
fn half_day() -> Decimal {
    Decimal::new(5, 1)
}

/// Consecutive idle days after which a project is abandoned.
pub const DEFAULT_ABANDON_DAYS: u32 = 3;

/// What happened to one project when the day settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDayOutcome {
    /// The project.
    pub project: ProjectId,
    /// Progress added today.
    pub progress_delta: Decimal,
    /// Progress after today.
    pub progress: Decimal,
    /// The goal.
    pub goal: Decimal,
    /// Today's contributors.
    pub contributors: Vec<AgentId>,
    /// Set when today's progress completed the project.
    pub completed: Option<CompletedProject>,
    /// Whether the project was abandoned today.
    pub abandoned: bool,
}

/// The facts the core needs to mint an asset from a completed project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedProject {
    /// The completed project.
    pub project: ProjectId,
    /// Display name.
    pub name: String,
    /// The asset type produced.
    pub asset_type: AssetType,
    /// Contributors with at least one full day, the asset's builder list.
    pub builders: Vec<AgentId>,
    /// Map footprint, if the type has one.
    pub tile: Option<TilePos>,
}

/// The board of all projects, active and settled.
#[derive(Debug, Clone)]
pub struct ProjectBoard {
    projects: BTreeMap<ProjectId, Project>,
    /// Contributions staged for the current day: project -> (agent, role).
    staged: BTreeMap<ProjectId, Vec<(AgentId, Role)>>,
    abandon_days: u32,
}

impl ProjectBoard {
    /// Create an empty board.
    pub const fn new() -> Self {
        Self::with_abandon_days(DEFAULT_ABANDON_DAYS)
    }

    /// Create an empty board with an explicit abandonment window.
    pub const fn with_abandon_days(abandon_days: u32) -> Self {
        Self {
            projects: BTreeMap::new(),
            staged: BTreeMap::new(),
            abandon_days,
        }
    }

    /// Rebuild from persisted projects (resume path).
    pub fn from_projects(projects: Vec<Project>, abandon_days: u32) -> Self {
        let mut board = Self::with_abandon_days(abandon_days);
        for project in projects {
            board.projects.insert(project.id, project);
        }
        board
    }

    /// Start a new project.
    pub fn start(
        &mut self,
        day: u64,
        name: impl Into<String>,
        asset_type: AssetType,
        proposer: AgentId,
        target_tile: Option<TilePos>,
    ) -> ProjectId {
        let blueprint = catalog::blueprint(asset_type);
        let id = ProjectId::new();
        let name = name.into();
        info!(day, %id, ?asset_type, name = name.as_str(), "project started");
        self.projects.insert(
            id,
            Project {
                id,
                name,
                project_type: asset_type,
                proposer,
                goal_builder_days: blueprint.goal_builder_days,
                contributors: BTreeMap::new(),
                progress: Decimal::ZERO,
                status: ProjectStatus::Active,
                day_started: day,
                day_completed: None,
                day_last_contribution: day,
                idle_days: 0,
                target_tile,
            },
        );
        id
    }

    /// Stage an agent's contribution for today.
    pub fn stage_contribution(
        &mut self,
        project: ProjectId,
        agent: AgentId,
        role: Role,
    ) -> Result<(), CityError> {
        let record = self
            .projects
            .get(&project)
            .ok_or(CityError::UnknownProject(project))?;
        if record.status != ProjectStatus::Active {
            return Err(CityError::ProjectNotActive(project));
        }
        let staged = self.staged.entry(project).or_default();
        if !staged.iter().any(|(a, _)| *a == agent) {
            staged.push((agent, role));
        }
        Ok(())
    }

    /// Add one vault-funded day of progress (public-goods policy).
    ///
    /// Counts as a full-crew day with no named contributors.
    pub fn fund_day(&mut self, day: u64, project: ProjectId) -> Result<ProjectDayOutcome, CityError> {
        let record = self
            .projects
            .get_mut(&project)
            .ok_or(CityError::UnknownProject(project))?;
        if record.status != ProjectStatus::Active {
            return Err(CityError::ProjectNotActive(project));
        }
        record.progress = record.progress.saturating_add(full_day());
        record.day_last_contribution = day;
        record.idle_days = 0;
        let completed = Self::maybe_complete(record, day);
        Ok(ProjectDayOutcome {
            project,
            progress_delta: full_day(),
            progress: record.progress,
            goal: record.goal_builder_days,
            contributors: Vec::new(),
            completed,
            abandoned: false,
        })
    }

    /// Settle the day: apply staged contributions, advance abandonment
    /// counters, and report what changed.
    pub fn close_day(&mut self, day: u64) -> Vec<ProjectDayOutcome> {
        let staged = core::mem::take(&mut self.staged);
        let mut outcomes = Vec::new();

        for (id, record) in &mut self.projects {
            if record.status != ProjectStatus::Active {
                continue;
            }

            let crew = staged.get(id).cloned().unwrap_or_default();
            if crew.is_empty() {
                record.idle_days = record.idle_days.saturating_add(1);
                if record.idle_days >= self.abandon_days {
                    record.status = ProjectStatus::Abandoned;
                    info!(day, %id, "project abandoned");
                    outcomes.push(ProjectDayOutcome {
                        project: *id,
                        progress_delta: Decimal::ZERO,
                        progress: record.progress,
                        goal: record.goal_builder_days,
                        contributors: Vec::new(),
                        completed: None,
                        abandoned: true,
                    });
                }
                continue;
            }

            let blueprint = catalog::blueprint(record.project_type);
            let delta = if crew_is_full(&blueprint, &crew) {
                full_day()
            } else {
                half_day()
            };

            for (agent, _) in &crew {
                let days = record.contributors.entry(*agent).or_insert(Decimal::ZERO);
                *days = days.saturating_add(delta);
            }
            record.progress = record.progress.saturating_add(delta);
            record.day_last_contribution = day;
            record.idle_days = 0;
            debug!(day, %id, %delta, progress = %record.progress, "project advanced");

            let completed = Self::maybe_complete(record, day);
            outcomes.push(ProjectDayOutcome {
                project: *id,
                progress_delta: delta,
                progress: record.progress,
                goal: record.goal_builder_days,
                contributors: crew.iter().map(|(agent, _)| *agent).collect(),
                completed,
                abandoned: false,
            });
        }

        outcomes
    }

    /// Mark completion if progress reached the goal.
    fn maybe_complete(record: &mut Project, day: u64) -> Option<CompletedProject> {
        if record.progress < record.goal_builder_days {
            return None;
        }
        record.status = ProjectStatus::Completed;
        record.day_completed = Some(day);
        info!(day, id = %record.id, "project completed");
        let builders: Vec<AgentId> = record
            .contributors
            .iter()
            .filter(|(_, days)| **days >= Decimal::ONE)
            .map(|(agent, _)| *agent)
            .collect();
        Some(CompletedProject {
            project: record.id,
            name: record.name.clone(),
            asset_type: record.project_type,
            builders,
            tile: record.target_tile,
        })
    }

    // -- queries ----------------------------------------------------------

    /// Fetch one project.
    pub fn get(&self, id: ProjectId) -> Result<&Project, CityError> {
        self.projects.get(&id).ok_or(CityError::UnknownProject(id))
    }

    /// All projects.
    pub fn all(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    /// Active projects only.
    pub fn active(&self) -> impl Iterator<Item = &Project> {
        self.projects
            .values()
            .filter(|p| p.status == ProjectStatus::Active)
    }

    /// The active project closest to completion (public-goods priority).
    ///
    /// Ties break toward the older project.
    pub fn highest_priority_active(&self) -> Option<ProjectId> {
        self.active()
            .max_by(|x, y| {
                let x_fraction = completion_key(x);
                let y_fraction = completion_key(y);
                x_fraction
                    .cmp(&y_fraction)
                    .then(y.day_started.cmp(&x.day_started))
            })
            .map(|p| p.id)
    }

    /// The first active project of a type, for decision targeting.
    pub fn active_of_type(&self, asset_type: AssetType) -> Option<ProjectId> {
        self.active()
            .find(|p| p.project_type == asset_type)
            .map(|p| p.id)
    }

    /// Projects touched on the given day (checkpoint delta).
    pub fn updated_on(&self, day: u64) -> Vec<&Project> {
        self.projects
            .values()
            .filter(|p| {
                p.day_last_contribution == day
                    || p.day_completed == Some(day)
                    || p.day_started == day
            })
            .collect()
    }
}

impl Default for ProjectBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether today's crew satisfies the blueprint for full progress.
fn crew_is_full(blueprint: &ProjectBlueprint, crew: &[(AgentId, Role)]) -> bool {
    let builder_count = u32::try_from(crew.len()).unwrap_or(u32::MAX);
    if builder_count < blueprint.builders_required {
        return false;
    }
    blueprint
        .required_role
        .is_none_or(|required| crew.iter().any(|(_, role)| *role == required))
}

/// Progress fraction scaled to a comparable integer key.
fn completion_key(project: &Project) -> i64 {
    use rust_decimal::prelude::ToPrimitive;
    if project.goal_builder_days.is_zero() {
        return i64::MAX;
    }
    project
        .progress
        .saturating_mul(Decimal::from(1000))
        .checked_div(project.goal_builder_days)
        .and_then(|d| d.floor().to_i64())
        .unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn full_crew_day_adds_one() {
        let mut board = ProjectBoard::new();
        let proposer = AgentId::new();
        let id = board.start(1, "north market", AssetType::Market, proposer, None);
        board.stage_contribution(id, proposer, Role::Builder).unwrap();
        let outcomes = board.close_day(1);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes.first().unwrap().progress_delta, Decimal::ONE);
    }

    #[test]
    fn partial_crew_day_adds_half() {
        let mut board = ProjectBoard::new();
        let proposer = AgentId::new();
        // Hospital requires a healer; a lone builder is a partial crew.
        let id = board.start(1, "hospital", AssetType::Hospital, proposer, None);
        board.stage_contribution(id, proposer, Role::Builder).unwrap();
        let outcomes = board.close_day(1);
        assert_eq!(
            outcomes.first().unwrap().progress_delta,
            Decimal::new(5, 1)
        );
    }

    #[test]
    fn hospital_completes_with_healer_over_five_days() {
        let mut board = ProjectBoard::new();
        let builder = AgentId::new();
        let healer = AgentId::new();
        let id = board.start(1, "hospital", AssetType::Hospital, builder, None);
        let mut completed = None;
        for day in 1..=5 {
            board.stage_contribution(id, builder, Role::Builder).unwrap();
            board.stage_contribution(id, healer, Role::Healer).unwrap();
            let outcomes = board.close_day(day);
            if let Some(done) = outcomes.first().and_then(|o| o.completed.clone()) {
                completed = Some((day, done));
            }
        }
        let (day, done) = completed.unwrap();
        assert_eq!(day, 5);
        assert_eq!(done.asset_type, AssetType::Hospital);
        assert!(done.builders.contains(&builder));
        assert!(done.builders.contains(&healer));
    }

    #[test]
    fn idle_days_abandon_the_project() {
        let mut board = ProjectBoard::new();
        let id = board.start(1, "road", AssetType::Road, AgentId::new(), None);
        for day in 1..=2 {
            assert!(board.close_day(day).is_empty());
        }
        let outcomes = board.close_day(3);
        assert!(outcomes.first().unwrap().abandoned);
        assert_eq!(board.get(id).unwrap().status, ProjectStatus::Abandoned);
    }

    #[test]
    fn contribution_resets_abandonment_counter() {
        let mut board = ProjectBoard::new();
        let worker = AgentId::new();
        let id = board.start(1, "road", AssetType::Road, worker, None);
        let _ = board.close_day(1);
        let _ = board.close_day(2);
        board.stage_contribution(id, worker, Role::Builder).unwrap();
        let _ = board.close_day(3);
        // Two more idle days are not yet enough again.
        let _ = board.close_day(4);
        let outcomes = board.close_day(5);
        assert!(outcomes.is_empty());
        assert_eq!(board.get(id).unwrap().status, ProjectStatus::Active);
    }

    #[test]
    fn fund_day_advances_without_contributors() {
        let mut board = ProjectBoard::new();
        let id = board.start(1, "road", AssetType::Road, AgentId::new(), None);
        let outcome = board.fund_day(2, id).unwrap();
        assert_eq!(outcome.progress_delta, Decimal::ONE);
        assert!(outcome.contributors.is_empty());
        let second = board.fund_day(3, id).unwrap();
        assert!(second.completed.is_some());
    }

    #[test]
    fn completed_projects_reject_contributions() {
        let mut board = ProjectBoard::new();
        let worker = AgentId::new();
        let id = board.start(1, "road", AssetType::Road, worker, None);
        let _ = board.fund_day(1, id).unwrap();
        let _ = board.fund_day(2, id).unwrap();
        assert!(matches!(
            board.stage_contribution(id, worker, Role::Builder),
            Err(CityError::ProjectNotActive(_))
        ));
    }

    #[test]
    fn priority_prefers_nearest_completion() {
        let mut board = ProjectBoard::new();
        let near = board.start(1, "road", AssetType::Road, AgentId::new(), None);
        let _far = board.start(1, "hospital", AssetType::Hospital, AgentId::new(), None);
        let _ = board.fund_day(2, near).unwrap();
        assert_eq!(board.highest_priority_active(), Some(near));
    }

    #[test]
    fn half_day_contributions_tracked_per_agent() {
        let mut board = ProjectBoard::new();
        let builder = AgentId::new();
        let id = board.start(1, "hospital", AssetType::Hospital, builder, None);
        board.stage_contribution(id, builder, Role::Builder).unwrap();
        let _ = board.close_day(1);
        let project = board.get(id).unwrap();
        assert_eq!(
            project.contributors.get(&builder).copied(),
            Some(Decimal::new(5, 1))
        );
    }
}
