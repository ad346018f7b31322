//! Payload obfuscation.
//!
//! # Data Flow
//! ```text
//! outbound text
//!     → alphabet.rs (shift every in-alphabet char forward)
//!     → wire
//!
//! inbound wire
//!     → alphabet.rs (shift back)
//!     → plaintext
//!
//! key exchange:
//!     key.rs renders the ShiftKey as decimal text under shift 0
//! ```
//!
//! # Design Decisions
//! - This is a substitution cipher over 36 symbols. It hides nothing from
//!   anyone who looks; treat it as obfuscation, never as confidentiality.
//! - Characters outside the alphabet pass through untouched in both directions
//! - The key travels through the same transform (shift 0), so there is no
//!   special wire format for it

pub mod alphabet;
pub mod key;

pub use alphabet::{decode, encode, ALPHABET};
pub use key::{ShiftKey, ShiftKeyError};
