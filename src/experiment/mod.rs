//! Trial and session sequencing over abstract display, input, clock and
//! output collaborators.

pub mod channel;
pub mod headless;
pub mod io;
pub mod record;
pub mod replay;
pub mod scripted;
pub mod session;
pub mod sink;
pub mod trial;
