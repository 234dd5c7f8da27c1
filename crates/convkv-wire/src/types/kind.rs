//! The five CRDT kinds a map entry can hold.

use std::fmt;
use std::str::FromStr;

/// Kind tag shared by operations, responses and field mappings.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CrdtKind {
    Register,
    Set,
    Map,
    Counter,
    Flag,
}

impl CrdtKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CrdtKind::Register => "register",
            CrdtKind::Set => "set",
            CrdtKind::Map => "map",
            CrdtKind::Counter => "counter",
            CrdtKind::Flag => "flag",
        }
    }
}

impl fmt::Display for CrdtKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrdtKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "register" => Ok(CrdtKind::Register),
            "set" => Ok(CrdtKind::Set),
            "map" => Ok(CrdtKind::Map),
            "counter" => Ok(CrdtKind::Counter),
            "flag" => Ok(CrdtKind::Flag),
            other => Err(format!("unknown crdt kind {:?}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_kinds() {
        for kind in [
            CrdtKind::Register,
            CrdtKind::Set,
            CrdtKind::Map,
            CrdtKind::Counter,
            CrdtKind::Flag,
        ] {
            assert_eq!(kind.as_str().parse::<CrdtKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("hyperloglog".parse::<CrdtKind>().is_err());
        assert!("Register".parse::<CrdtKind>().is_err());
    }
}
