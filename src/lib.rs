//! A virtual pet for the terminal: five needs that wear down over time and a
//! small command console to look after them.

pub mod app;
pub mod command;
pub mod config;
pub mod input;
pub mod logging;
pub mod model;
pub mod render;
pub mod sim;
pub mod view;

pub use command::{submit, Command, CommandError};
pub use model::{NeedKind, Needs, Pet, MAX_STAT};
pub use sim::{DecayInterval, Session, SessionConfig};
pub use view::{PetView, Transcript};
