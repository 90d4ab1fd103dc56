//! Role capability descriptors.
//!
//! Replaces role-dispatch by string match: each [`Role`] maps to a static
//! [`RoleCapabilities`] naming its allowed actions, default action, earn
//! range, and required collaborators for builds.

use crate::enums::{ActionKind, Role};

/// Static behavioral profile for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleCapabilities {
    /// The role this profile describes.
    pub role: Role,
    /// Actions the role may take. Decisions outside this set are rejected.
    pub allowed: &'static [ActionKind],
    /// The action substituted when a reasoning call fails or parses badly.
    pub default_action: ActionKind,
    /// Inclusive daily earn range for ordinary work, before modifiers.
    pub earn_range: (i64, i64),
}

/// Actions every role may take in addition to its own vocabulary.
const COMMON: [ActionKind; 5] = [
    ActionKind::SendMessage,
    ActionKind::Report,
    ActionKind::ClaimHome,
    ActionKind::Trade,
    ActionKind::Rest,
];

/// Look up the capability profile for a role.
pub const fn for_role(role: Role) -> RoleCapabilities {
    match role {
        Role::Builder => RoleCapabilities {
            role,
            allowed: &[
                ActionKind::Work,
                ActionKind::ContributeProject,
                ActionKind::StartProject,
                ActionKind::SendMessage,
                ActionKind::Report,
                ActionKind::ClaimHome,
                ActionKind::Trade,
                ActionKind::Rest,
            ],
            default_action: ActionKind::Work,
            earn_range: (40, 80),
        },
        Role::Explorer => RoleCapabilities {
            role,
            allowed: &[
                ActionKind::Explore,
                ActionKind::Work,
                ActionKind::SendMessage,
                ActionKind::Report,
                ActionKind::ClaimHome,
                ActionKind::Trade,
                ActionKind::Rest,
            ],
            default_action: ActionKind::Explore,
            earn_range: (0, 150),
        },
        Role::Merchant => RoleCapabilities {
            role,
            allowed: &[
                ActionKind::Work,
                ActionKind::Trade,
                ActionKind::StartProject,
                ActionKind::ContributeProject,
                ActionKind::SendMessage,
                ActionKind::Report,
                ActionKind::ClaimHome,
                ActionKind::Rest,
            ],
            default_action: ActionKind::Work,
            earn_range: (20, 60),
        },
        Role::Police => RoleCapabilities {
            role,
            allowed: &[
                ActionKind::Patrol,
                ActionKind::SendMessage,
                ActionKind::Report,
                ActionKind::ClaimHome,
                ActionKind::Trade,
                ActionKind::Rest,
            ],
            default_action: ActionKind::Patrol,
            earn_range: (40, 70),
        },
        Role::Teacher => RoleCapabilities {
            role,
            allowed: &[
                ActionKind::Teach,
                ActionKind::ContributeProject,
                ActionKind::SendMessage,
                ActionKind::Report,
                ActionKind::ClaimHome,
                ActionKind::Trade,
                ActionKind::Rest,
            ],
            default_action: ActionKind::Teach,
            earn_range: (30, 60),
        },
        Role::Healer => RoleCapabilities {
            role,
            allowed: &[
                ActionKind::Heal,
                ActionKind::Work,
                ActionKind::ContributeProject,
                ActionKind::SendMessage,
                ActionKind::Report,
                ActionKind::ClaimHome,
                ActionKind::Trade,
                ActionKind::Rest,
            ],
            default_action: ActionKind::Heal,
            earn_range: (30, 70),
        },
        Role::Messenger => RoleCapabilities {
            role,
            allowed: &[
                ActionKind::Deliver,
                ActionKind::ContributeProject,
                ActionKind::SendMessage,
                ActionKind::Report,
                ActionKind::ClaimHome,
                ActionKind::Trade,
                ActionKind::Rest,
            ],
            default_action: ActionKind::Deliver,
            earn_range: (25, 55),
        },
        Role::Lawyer => RoleCapabilities {
            role,
            allowed: &[
                ActionKind::Defend,
                ActionKind::Work,
                ActionKind::SendMessage,
                ActionKind::Report,
                ActionKind::ClaimHome,
                ActionKind::Trade,
                ActionKind::Rest,
            ],
            default_action: ActionKind::Defend,
            earn_range: (30, 90),
        },
        Role::Thief => RoleCapabilities {
            role,
            allowed: &[
                ActionKind::Steal,
                ActionKind::Lurk,
                ActionKind::OfferBribe,
                ActionKind::SendMessage,
                ActionKind::ClaimHome,
                ActionKind::Trade,
                ActionKind::Rest,
            ],
            default_action: ActionKind::Lurk,
            earn_range: (0, 0),
        },
        Role::Newborn => RoleCapabilities {
            role,
            allowed: &[
                ActionKind::Study,
                ActionKind::SendMessage,
                ActionKind::Report,
                ActionKind::Rest,
            ],
            default_action: ActionKind::Study,
            earn_range: (0, 10),
        },
        Role::GangLeader => RoleCapabilities {
            role,
            allowed: &[
                ActionKind::Recruit,
                ActionKind::Steal,
                ActionKind::Lurk,
                ActionKind::OfferBribe,
                ActionKind::SendMessage,
                ActionKind::ClaimHome,
                ActionKind::Trade,
                ActionKind::Rest,
            ],
            default_action: ActionKind::Lurk,
            earn_range: (0, 0),
        },
        Role::Blackmailer => RoleCapabilities {
            role,
            allowed: &[
                ActionKind::Blackmail,
                ActionKind::Lurk,
                ActionKind::SendMessage,
                ActionKind::ClaimHome,
                ActionKind::Trade,
                ActionKind::Rest,
            ],
            default_action: ActionKind::Lurk,
            earn_range: (0, 0),
        },
        Role::Saboteur => RoleCapabilities {
            role,
            allowed: &[
                ActionKind::DestroyAsset,
                ActionKind::Lurk,
                ActionKind::SendMessage,
                ActionKind::ClaimHome,
                ActionKind::Trade,
                ActionKind::Rest,
            ],
            default_action: ActionKind::Lurk,
            earn_range: (0, 0),
        },
    }
}

/// The action substituted when a role's reasoning call fails.
pub const fn default_action(role: Role) -> ActionKind {
    for_role(role).default_action
}

/// Whether the action is in the role's vocabulary.
pub fn is_allowed(role: Role, action: ActionKind) -> bool {
    for_role(role).allowed.contains(&action)
}

/// Roles a graduating newborn may be assigned.
///
/// Criminal roles and police are excluded: graduates enter civic life and
/// drift later through play, not through the graduation ceremony.
pub const GRADUATION_ROLES: [Role; 6] = [
    Role::Builder,
    Role::Explorer,
    Role::Merchant,
    Role::Teacher,
    Role::Healer,
    Role::Messenger,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_allows_its_default() {
        for role in [
            Role::Builder,
            Role::Explorer,
            Role::Merchant,
            Role::Police,
            Role::Teacher,
            Role::Healer,
            Role::Messenger,
            Role::Lawyer,
            Role::Thief,
            Role::Newborn,
            Role::GangLeader,
            Role::Blackmailer,
            Role::Saboteur,
        ] {
            let caps = for_role(role);
            assert!(
                caps.allowed.contains(&caps.default_action),
                "default action of {role:?} not in its vocabulary"
            );
        }
    }

    #[test]
    fn common_actions_widely_available() {
        for action in COMMON {
            assert!(is_allowed(Role::Builder, action));
        }
    }

    #[test]
    fn police_cannot_steal() {
        assert!(!is_allowed(Role::Police, ActionKind::Steal));
    }

    #[test]
    fn graduation_roles_exclude_crime_and_police() {
        assert!(!GRADUATION_ROLES.contains(&Role::Thief));
        assert!(!GRADUATION_ROLES.contains(&Role::Police));
        assert!(!GRADUATION_ROLES.contains(&Role::Newborn));
    }
}
