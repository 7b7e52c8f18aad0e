//! Crate-wide error type.
//!
//! Per the error handling design, only failures that cross an async
//! boundary and must be surfaced to an operator (config, bind, ICE
//! provider) are represented here. Failures scoped to a single peer
//! session (malformed message, failed `addIceCandidate`, unauthorized
//! command) are swallowed and logged at the point of occurrence instead
//! of being threaded through `Result` — see `signalling::peer_session`.

use failure::Fail;

use crate::{conf::ConfError, ice::IceError};

#[derive(Debug, Fail)]
pub enum AviaryError {
    #[fail(display = "configuration error: {}", _0)]
    Conf(#[fail(cause)] ConfError),

    #[fail(display = "ICE credential provider error: {}", _0)]
    Ice(#[fail(cause)] IceError),

    #[fail(display = "failed to bind {}: {}", _0, _1)]
    Bind(String, std::io::Error),
}

impl From<ConfError> for AviaryError {
    fn from(e: ConfError) -> Self {
        Self::Conf(e)
    }
}

impl From<IceError> for AviaryError {
    fn from(e: IceError) -> Self {
        Self::Ice(e)
    }
}
