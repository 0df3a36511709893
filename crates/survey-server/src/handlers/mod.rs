//! Route handlers.
//!
//! | Method | Path | Auth |
//! |--------|------|------|
//! | `GET`  | `/health` | none |
//! | `POST` | `/api/survey` | rate-limited |
//! | `GET`  | `/api/survey/{identifier}` | rate-limited |
//! | `GET`  | `/api/survey/{identifier}/status` | rate-limited |
//! | `GET`  | `/api/admin/surveys` | admin |
//! | `GET`  | `/api/admin/surveys/{identifier}` | admin |
//! | `GET`  | `/api/admin/export` | admin |

pub mod admin;
pub mod health;
pub mod submissions;
