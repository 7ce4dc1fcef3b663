//! JSON-over-HTTP front end for the pagewalk engine.
//!
//! | Method | Path          | Body / query                       |
//! |--------|---------------|------------------------------------|
//! | GET    | `/health`     |                                    |
//! | POST   | `/extract`    | `{url}`                            |
//! | POST   | `/detect`     | `{url, pattern?}`                  |
//! | POST   | `/check-lock` | `{url, pattern?}`                  |
//! | POST   | `/navigate`   | `{current_url, direction}`         |
//! | POST   | `/queue`      | `{url}`                            |
//! | POST   | `/book`       | `{url, max_chapters?}`             |
//! | GET    | `/memory`     |                                    |
//! | DELETE | `/memory`     | `?scope=` all, patterns, content, queue |

pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::{app, router};
