//! Client-side session handling: the token, role and id a front end keeps
//! after logging in, and the rules it applies before calling the API.

pub mod failure;
pub mod session;
pub mod storage;

pub use failure::RequestFailure;
pub use session::{RouteAccess, SessionState};
pub use storage::{FileSessionStorage, MemorySessionStorage, Session, SessionStorage};
