//! Database layer for data persistence and access.
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (page handlers, round recorder)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! Repositories borrow a `&mut PgConnection`, so callers decide whether a group of calls runs
//! inside one transaction:
//!
//! ```ignore
//! use golftrack::db::handlers::{Repository, Rounds};
//!
//! let mut tx = pool.begin().await?;
//! let round = Rounds::new(&mut tx).create(&request).await?;
//! tx.commit().await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
