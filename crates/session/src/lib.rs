//! Session layer of the parley conversation engine.
//!
//! Wires the transport, renderer and host together: one submission at a
//! time, a remote file catalog beside the transcript and an optional voice
//! control that fills the text field.

pub mod catalog;
pub mod controller;
pub mod single_flight;
pub mod voice;

#[cfg(test)]
mod testing;

pub use catalog::CatalogClient;
pub use controller::{
    BUSY_NOTICE, DEFAULT_UPLOAD_LANGUAGE, RESET_CONFIRMED, RESET_FAILED, ResetOutcome, SessionController, SubmitOutcome,
};
pub use single_flight::{FlightPermit, SingleFlight};
pub use voice::{CommandRecognizer, SpeechRecognizer, VoiceAdapter};
