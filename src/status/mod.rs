pub mod falling;
pub mod transition;

use crate::entities::matter::Matter;
use crate::entities::object::ObjectId;
use crate::world::map::Map;
use std::fmt;
use std::time::Duration;

pub use falling::{Falling, FALL_UNIT};
pub use transition::{Transition, SQUEEZE_DURATION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusKind {
    Falling,
    Crouching,
    Squeezing,
    Unsqueezing,
    Running,
    Flying,
    Floating,
    Swimming,
    Wizard,
}

impl StatusKind {
    /// Statuses an owner may toggle directly.
    pub fn is_voluntary(self) -> bool {
        !matches!(self, StatusKind::Falling | StatusKind::Swimming)
    }

    /// Statuses that keep an object from falling.
    pub fn is_airborne(self) -> bool {
        matches!(
            self,
            StatusKind::Flying | StatusKind::Floating | StatusKind::Wizard
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            StatusKind::Falling => "falling",
            StatusKind::Crouching => "crouching",
            StatusKind::Squeezing => "squeezing",
            StatusKind::Unsqueezing => "unsqueezing",
            StatusKind::Running => "running",
            StatusKind::Flying => "flying",
            StatusKind::Floating => "floating",
            StatusKind::Swimming => "swimming",
            StatusKind::Wizard => "wizard",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusStep {
    Keep,
    Remove,
}

/// A time-driven condition attached to one object.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Falling(Falling),
    Crouching,
    Squeezing(Transition),
    Unsqueezing(Transition),
    Running,
    Flying,
    Floating,
    Swimming,
    Wizard,
}

impl Status {
    pub fn from_kind(kind: StatusKind) -> Self {
        match kind {
            StatusKind::Falling => Status::Falling(Falling::default()),
            StatusKind::Crouching => Status::Crouching,
            StatusKind::Squeezing => Status::Squeezing(Transition::squeeze()),
            StatusKind::Unsqueezing => Status::Unsqueezing(Transition::squeeze()),
            StatusKind::Running => Status::Running,
            StatusKind::Flying => Status::Flying,
            StatusKind::Floating => Status::Floating,
            StatusKind::Swimming => Status::Swimming,
            StatusKind::Wizard => Status::Wizard,
        }
    }

    pub fn falling() -> Self {
        Status::from_kind(StatusKind::Falling)
    }

    pub fn running() -> Self {
        Status::Running
    }

    pub fn kind(&self) -> StatusKind {
        match self {
            Status::Falling(_) => StatusKind::Falling,
            Status::Crouching => StatusKind::Crouching,
            Status::Squeezing(_) => StatusKind::Squeezing,
            Status::Unsqueezing(_) => StatusKind::Unsqueezing,
            Status::Running => StatusKind::Running,
            Status::Flying => StatusKind::Flying,
            Status::Floating => StatusKind::Floating,
            Status::Swimming => StatusKind::Swimming,
            Status::Wizard => StatusKind::Wizard,
        }
    }

    /// Advances the status by `delta`. `siblings` lists the kinds attached to
    /// the same object when the tick started.
    pub fn update(
        &mut self,
        object: ObjectId,
        siblings: &[StatusKind],
        map: &mut Map,
        delta: Duration,
    ) -> StatusStep {
        match self {
            Status::Falling(falling) => falling.update(object, siblings, map, delta),
            Status::Squeezing(transition) => transition.update(object, map, delta, true),
            Status::Unsqueezing(transition) => transition.update(object, map, delta, false),
            Status::Swimming => {
                if map.footprint_has_matter(object, Matter::LIQUID) {
                    StatusStep::Keep
                } else {
                    StatusStep::Remove
                }
            }
            Status::Crouching
            | Status::Running
            | Status::Flying
            | Status::Floating
            | Status::Wizard => StatusStep::Keep,
        }
    }
}
