//! Recovery phrase primitives
//!
//! This module provides the wordlist, phrase generation from secure
//! entropy, selection of concealed positions, and validation of the
//! words a user retypes to prove the phrase was recorded.

pub mod wordlist;
pub mod mnemonic;
pub mod concealment;
pub mod confirmation;

pub use wordlist::*;
pub use mnemonic::*;
pub use concealment::*;
pub use confirmation::*;
