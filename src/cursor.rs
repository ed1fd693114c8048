//! Position bookkeeping shared by the cursors of both maps.
//!
//! Neither map allocates an "end" node. A cursor is either on a live node or
//! on the end position, one past the last element.

use crate::arena::Handle;
use crate::error::{MapError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Position {
    At(Handle),
    End,
}

impl Position {
    pub(crate) fn from_link(link: Option<Handle>) -> Self {
        match link {
            Some(handle) => Position::At(handle),
            None => Position::End,
        }
    }

    pub(crate) fn handle(self) -> Option<Handle> {
        match self {
            Position::At(handle) => Some(handle),
            Position::End => None,
        }
    }
}

/// Steps forward from `position` with `successor`, refusing to leave the end position.
pub(crate) fn step_next<F>(position: Position, successor: F) -> Result<Position>
where
    F: FnOnce(Handle) -> Option<Handle>,
{
    match position {
        Position::At(handle) => Ok(Position::from_link(successor(handle))),
        Position::End => Err(MapError::IteratorOutOfRange),
    }
}

/// Steps backward from `position`. `last` yields where the end position steps to.
pub(crate) fn step_prev<L, F>(position: Position, last: L, predecessor: F) -> Result<Position>
where
    L: FnOnce() -> Option<Handle>,
    F: FnOnce(Handle) -> Option<Handle>,
{
    let target = match position {
        Position::At(handle) => predecessor(handle),
        Position::End => last(),
    };
    target.map(Position::At).ok_or(MapError::IteratorOutOfRange)
}
