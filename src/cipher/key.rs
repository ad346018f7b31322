//! The shared shift key and its wire form.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use thiserror::Error;

use crate::cipher::alphabet::{decode, encode};

/// Largest shift a server may hand out.
pub const MAX_SHIFT: u8 = 26;

/// Errors produced while building or parsing a [`ShiftKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShiftKeyError {
    #[error("shift {0} is outside 0..=26")]
    OutOfRange(u32),

    #[error("shift key frame {0:?} is not a number")]
    NotNumeric(String),
}

/// Substitution offset shared by every party of one server run.
///
/// Immutable once created. `ShiftKey::ZERO` is only used to frame the key
/// itself; session keys are in `1..=26`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShiftKey(u8);

impl ShiftKey {
    /// The identity key, used for the key exchange frame.
    pub const ZERO: ShiftKey = ShiftKey(0);

    pub fn new(value: u8) -> Result<Self, ShiftKeyError> {
        if value > MAX_SHIFT {
            return Err(ShiftKeyError::OutOfRange(value as u32));
        }
        Ok(Self(value))
    }

    /// Pick a session key uniformly from `1..=26`.
    pub fn random() -> Self {
        Self(rand::thread_rng().gen_range(1..=MAX_SHIFT))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub(crate) fn offset(&self) -> usize {
        self.0 as usize
    }

    /// Key exchange payload: the decimal key under the zero shift.
    pub fn to_wire(&self) -> String {
        encode(Self::ZERO, &self.0.to_string())
    }

    /// Parse the first frame a client receives.
    pub fn from_wire(frame: &str) -> Result<Self, ShiftKeyError> {
        decode(Self::ZERO, frame).parse()
    }
}

impl fmt::Display for ShiftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ShiftKey {
    type Err = ShiftKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value: u32 = trimmed
            .parse()
            .map_err(|_| ShiftKeyError::NotNumeric(trimmed.to_string()))?;
        let value = u8::try_from(value).map_err(|_| ShiftKeyError::OutOfRange(value))?;
        Self::new(value)
    }
}
