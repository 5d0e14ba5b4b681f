//! # Aquila language types
//!
//! Static types live only in the compiler; runtime values carry no type tag
//! at all. The two meet at the print opcodes, which are chosen by static type.

pub mod ty;
pub mod value;
