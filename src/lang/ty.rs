use serde::{Deserialize, Serialize};

/// Compile-time type of an expression or variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StaticType {
    Integer,
    Boolean,
    /// Reserved for no-value contexts; no construct produces it yet.
    Unit,
}

impl std::fmt::Display for StaticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StaticType::Integer => write!(f, "integer"),
            StaticType::Boolean => write!(f, "boolean"),
            StaticType::Unit => write!(f, "unit"),
        }
    }
}
