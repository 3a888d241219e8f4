//! Domain models for the remedy core.
//!
//! - `Actor`: the authenticated caller
//! - inputs: `NewReview`, `ReviewEdit`, `NewComment`, `CommentEdit`,
//!   `NewUser`, `NewRemedy`, `NewSource`
//! - `RemedyError`: the error taxonomy surfaced to outer layers

pub mod actor;
pub mod error;
pub mod input;

pub use actor::Actor;
pub use error::{ErrorKind, Failure, RemedyError, Result};
pub use input::{
    CommentEdit, NewComment, NewRemedy, NewReview, NewSource, NewUser, ReviewEdit,
};

/// Parse a caller-supplied identifier, reporting a malformed one as a
/// validation error.
pub fn parse_id<T>(raw: &str) -> Result<T>
where
    T: std::str::FromStr<Err = remedy_state::InvalidId>,
{
    raw.trim().parse::<T>().map_err(RemedyError::from)
}
