//! Repository implementations, one per table group.

pub mod repository;
pub mod rounds;
pub mod stats;
pub mod users;

pub use repository::Repository;
pub use rounds::Rounds;
pub use stats::RoundStats;
pub use users::Users;
