//! Review sessions and their on-disk store.
//!
//! A session records which files one review pass covered. Sessions chain
//! through `continued_from`, so a large change set can be reviewed in
//! installments: each continuation excludes every file reviewed earlier in
//! its chain.
//!
//! State lives outside the repository, under
//! `$HOME/.stint/review/<project hash>/`:
//!
//! ```text
//! project.json
//! sessions/latest          # id of the last saved session
//! sessions/<id>/meta.json
//! ```

mod atomic;
pub mod session;
pub mod store;

pub use session::{Session, Status};
pub use store::{project_hash, ProjectMeta, Store};
