//! # Publication Workflow
//!
//! The allowed-transition policy is data, not control flow: a table of
//! `(from, to, required role)` rules. Call sites only ask the table.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::errors::{DomainError, Result};
use crate::models::{Actor, Role};
use crate::status::*;

/// A single permitted move between two status slugs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: String,
    pub to: String,
    /// Lowest role allowed to perform the move. Moderators satisfy `Author`.
    pub required: Role,
}

impl TransitionRule {
    pub fn new(from: &str, to: &str, required: Role) -> Self {
        Self { from: from.to_string(), to: to.to_string(), required }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    rules: BTreeMap<(String, String), Role>,
}

impl TransitionTable {
    pub fn from_rules(rules: impl IntoIterator<Item = TransitionRule>) -> Self {
        let mut table = Self::default();
        for rule in rules {
            table
                .rules
                .entry((rule.from, rule.to))
                .and_modify(|role| *role = (*role).min(rule.required))
                .or_insert(rule.required);
        }
        table
    }

    /// The default editorial policy.
    pub fn standard() -> Self {
        use Role::{Author, Moderator};

        let author_moves: &[(&str, &[&str])] = &[
            (DRAFT, &[PENDING, REVIEW, SCHEDULED, PUBLISHED, PRIVATE, TRASH]),
            (PENDING, &[DRAFT, REVIEW, SCHEDULED, PUBLISHED, PRIVATE, TRASH]),
            (PRIVATE, &[DRAFT, PENDING, SCHEDULED, PUBLISHED, TRASH]),
            (SCHEDULED, &[DRAFT, PENDING, PRIVATE, PUBLISHED, TRASH]),
            (PUBLISHED, &[DRAFT, PRIVATE, TRASH]),
            (REVIEW, &[DRAFT]),
            (REJECTED, &[DRAFT, TRASH]),
        ];
        let moderator_moves: &[(&str, &[&str])] = &[
            (REVIEW, &[PUBLISHED, SCHEDULED, FEATURED, REJECTED]),
            (PENDING, &[REJECTED]),
            (PUBLISHED, &[FEATURED, ARCHIVED]),
            (FEATURED, &[PUBLISHED, DRAFT, ARCHIVED, TRASH]),
            (PRIVATE, &[ARCHIVED]),
            (REJECTED, &[ARCHIVED]),
            (TRASH, &[DRAFT]),
            (ARCHIVED, &[DRAFT]),
        ];

        let expand = |moves: &[(&str, &[&str])], role: Role| {
            moves
                .iter()
                .flat_map(move |(from, targets)| {
                    targets.iter().map(move |to| TransitionRule::new(from, to, role))
                })
                .collect::<Vec<_>>()
        };

        Self::from_rules(expand(author_moves, Author).into_iter().chain(expand(moderator_moves, Moderator)))
    }

    /// Checks a move for a caller acting with `role` on the post.
    pub fn authorize(&self, from: &str, to: &str, role: Role) -> Result<()> {
        match self.rules.get(&(from.to_string(), to.to_string())) {
            None => Err(DomainError::InvalidTransition { from: from.to_string(), to: to.to_string() }),
            Some(required) if role >= *required => Ok(()),
            Some(required) => Err(DomainError::NotAuthorized(format!(
                "moving a post from '{from}' to '{to}' requires the {} role",
                required.as_str()
            ))),
        }
    }

    /// Every status `role` may move a post in `from` to.
    pub fn targets_from(&self, from: &str, role: Role) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|((src, _), required)| src == from && role >= **required)
            .map(|((_, to), _)| to.as_str())
            .collect()
    }

    pub fn rules(&self) -> impl Iterator<Item = TransitionRule> + '_ {
        self.rules
            .iter()
            .map(|((from, to), required)| TransitionRule { from: from.clone(), to: to.clone(), required: *required })
    }
}

/// The role an actor holds with respect to one post.
///
/// Moderator privilege wins over ownership; anyone who is neither the author
/// nor a moderator has no role at all.
pub fn role_on_post(actor: &Actor, author_id: Uuid) -> Result<Role> {
    if actor.is_moderator() {
        Ok(Role::Moderator)
    } else if actor.id == author_id {
        Ok(Role::Author)
    } else {
        Err(DomainError::NotAuthorized("only the author or a moderator may change this post".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_can_publish_own_draft() {
        let table = TransitionTable::standard();
        assert!(table.authorize(DRAFT, PUBLISHED, Role::Author).is_ok());
    }

    #[test]
    fn archiving_requires_moderator() {
        let table = TransitionTable::standard();
        assert!(matches!(
            table.authorize(PUBLISHED, ARCHIVED, Role::Author),
            Err(DomainError::NotAuthorized(_))
        ));
        assert!(table.authorize(PUBLISHED, ARCHIVED, Role::Moderator).is_ok());
    }

    #[test]
    fn unknown_pair_is_invalid_for_every_role() {
        let table = TransitionTable::standard();
        for role in [Role::Author, Role::Moderator] {
            assert_eq!(
                table.authorize(TRASH, PUBLISHED, role),
                Err(DomainError::InvalidTransition { from: TRASH.into(), to: PUBLISHED.into() })
            );
            assert!(matches!(
                table.authorize(DRAFT, DRAFT, role),
                Err(DomainError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn restoring_from_trash_or_archive_is_moderator_only() {
        let table = TransitionTable::standard();
        for from in [TRASH, ARCHIVED] {
            assert!(matches!(table.authorize(from, DRAFT, Role::Author), Err(DomainError::NotAuthorized(_))));
            assert!(table.authorize(from, DRAFT, Role::Moderator).is_ok());
        }
    }

    #[test]
    fn duplicate_rules_keep_the_lowest_role() {
        let table = TransitionTable::from_rules([
            TransitionRule::new(DRAFT, PUBLISHED, Role::Moderator),
            TransitionRule::new(DRAFT, PUBLISHED, Role::Author),
        ]);
        assert!(table.authorize(DRAFT, PUBLISHED, Role::Author).is_ok());
        assert_eq!(table.rules().count(), 1);
    }

    #[test]
    fn targets_depend_on_role() {
        let table = TransitionTable::standard();
        let author = table.targets_from(PUBLISHED, Role::Author);
        let moderator = table.targets_from(PUBLISHED, Role::Moderator);
        assert!(!author.contains(&FEATURED));
        assert!(moderator.contains(&FEATURED));
        assert!(moderator.contains(&DRAFT));
    }

    #[test]
    fn stranger_has_no_role() {
        let author = Uuid::now_v7();
        let stranger = Actor::new(Uuid::now_v7(), Role::Author);
        let moderator = Actor::new(Uuid::now_v7(), Role::Moderator);

        assert!(matches!(role_on_post(&stranger, author), Err(DomainError::NotAuthorized(_))));
        assert_eq!(role_on_post(&Actor::new(author, Role::Author), author), Ok(Role::Author));
        assert_eq!(role_on_post(&moderator, author), Ok(Role::Moderator));
    }
}
