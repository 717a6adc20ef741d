pub mod credentials;
pub mod guard;
pub mod handlers;
pub mod session;
pub mod token;

pub use guard::{AdminPrincipal, Principal, Scope};
