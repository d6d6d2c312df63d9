//! Entity kinds and stage selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Entity type moved by one migration stage.
///
/// Declaration order is the stage execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Food,
    FoodLog,
}

impl EntityKind {
    /// All kinds in dependency order.
    pub const ALL: [EntityKind; 3] = [EntityKind::User, EntityKind::Food, EntityKind::FoodLog];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::User => "user",
            Self::Food => "food",
            Self::FoodLog => "food_log",
        }
    }

    /// Stage name as accepted on the command line.
    #[must_use]
    pub const fn stage_name(&self) -> &'static str {
        match *self {
            Self::User => "users",
            Self::Food => "foods",
            Self::FoodLog => "foodlogs",
        }
    }

    /// Kinds whose identity maps this stage reads.
    #[must_use]
    pub const fn prerequisites(&self) -> &'static [EntityKind] {
        match *self {
            Self::User | Self::Food => &[],
            Self::FoodLog => &[EntityKind::User, EntityKind::Food],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stage_name())
    }
}

/// Set of stages selected for one invocation.
///
/// Iteration always follows dependency order regardless of how the set
/// was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageSet {
    users: bool,
    foods: bool,
    food_logs: bool,
}

impl StageSet {
    #[must_use]
    pub const fn all() -> Self {
        Self { users: true, foods: true, food_logs: true }
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self { users: false, foods: false, food_logs: false }
    }

    #[must_use]
    pub fn with(mut self, kind: EntityKind) -> Self {
        self.insert(kind);
        self
    }

    pub fn insert(&mut self, kind: EntityKind) {
        match kind {
            EntityKind::User => self.users = true,
            EntityKind::Food => self.foods = true,
            EntityKind::FoodLog => self.food_logs = true,
        }
    }

    #[must_use]
    pub const fn contains(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::User => self.users,
            EntityKind::Food => self.foods,
            EntityKind::FoodLog => self.food_logs,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.users && !self.foods && !self.food_logs
    }

    /// Selected kinds in dependency order.
    pub fn iter(&self) -> impl Iterator<Item = EntityKind> + use<> {
        let set = *self;
        EntityKind::ALL.into_iter().filter(move |kind| set.contains(*kind))
    }

    /// Parses command-line selectors (`all`, `users`, `foods`, `foodlogs`).
    ///
    /// An empty selector list selects every stage.
    ///
    /// # Errors
    /// Returns `CoreError::UnknownStage` for an unrecognised selector.
    pub fn from_selectors<S: AsRef<str>>(selectors: &[S]) -> Result<Self, CoreError> {
        if selectors.is_empty() {
            return Ok(Self::all());
        }
        let mut set = Self::empty();
        for selector in selectors {
            let selector = selector.as_ref();
            if selector.trim().eq_ignore_ascii_case("all") {
                return Ok(Self::all());
            }
            set.insert(selector.parse()?);
        }
        Ok(set)
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "users" | "user" => Ok(Self::User),
            "foods" | "food" => Ok(Self::Food),
            "foodlogs" | "foodlog" | "food_logs" | "food-logs" => Ok(Self::FoodLog),
            other => Err(CoreError::UnknownStage(other.to_owned())),
        }
    }
}

impl fmt::Display for StageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|kind| kind.stage_name()).collect();
        f.write_str(&names.join(","))
    }
}
