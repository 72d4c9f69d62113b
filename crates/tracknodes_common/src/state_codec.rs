//! Node state codec.
//!
//! Maps the pbsnodes condition vocabulary ("offline", "down", ...) onto a
//! stable bitmask so states can be stored as integers and rendered back.
//!
//! `0` is reserved for a healthy node ("online" / "free"). It is never the
//! result of OR-ing flags: text that matches no known token gets the
//! `UNDETECTED` bit instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bit-set of node conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateMask(pub u32);

impl StateMask {
    pub const ONLINE: StateMask = StateMask(0);
    pub const OFFLINE: StateMask = StateMask(1);
    pub const DOWN: StateMask = StateMask(1 << 1);
    pub const RESERVE: StateMask = StateMask(1 << 2);
    pub const JOB_EXCLUSIVE: StateMask = StateMask(1 << 3);
    pub const JOB_SHARING: StateMask = StateMask(1 << 4);
    pub const BUSY: StateMask = StateMask(1 << 5);
    pub const TIME_SHARED: StateMask = StateMask(1 << 6);
    pub const STATE_UNKNOWN: StateMask = StateMask(1 << 7);
    pub const UNDETECTED: StateMask = StateMask(1 << 10);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_online(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: StateMask) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for StateMask {
    type Output = StateMask;

    fn bitor(self, rhs: StateMask) -> StateMask {
        StateMask(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for StateMask {
    fn bitor_assign(&mut self, rhs: StateMask) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for StateMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&decode(Some(*self)))
    }
}

/// Token that short-circuits to a healthy node.
const FREE_TOKEN: &str = "free";

/// Decoded name for a missing state.
pub const UNDETECTED_STATE: &str = "undetected-state";

/// Decoded name for a healthy node.
pub const ONLINE_STATE: &str = "online";

/// Recognized tokens in bit order. Also the decode order.
const VOCABULARY: [(&str, StateMask); 8] = [
    ("offline", StateMask::OFFLINE),
    ("down", StateMask::DOWN),
    ("reserve", StateMask::RESERVE),
    ("job-exclusive", StateMask::JOB_EXCLUSIVE),
    ("job-sharing", StateMask::JOB_SHARING),
    ("busy", StateMask::BUSY),
    ("time-shared", StateMask::TIME_SHARED),
    ("state-unknown", StateMask::STATE_UNKNOWN),
];

/// Encode resource-manager state text into a mask.
///
/// Matching is case-sensitive substring search, so `"offline,down"` and
/// `"down offline"` both encode to `OFFLINE | DOWN`.
pub fn encode(text: &str) -> StateMask {
    if text.contains(FREE_TOKEN) {
        return StateMask::ONLINE;
    }

    let mut state = StateMask::ONLINE;
    for (token, flag) in VOCABULARY {
        if text.contains(token) {
            state |= flag;
        }
    }

    if state.is_online() {
        state = StateMask::UNDETECTED;
    }
    state
}

/// Decode a mask into comma-joined condition names.
pub fn decode(state: Option<StateMask>) -> String {
    let state = match state {
        None => return UNDETECTED_STATE.to_string(),
        Some(s) if s.is_online() => return ONLINE_STATE.to_string(),
        Some(s) => s,
    };

    let mut names: Vec<&str> = VOCABULARY
        .iter()
        .filter(|(_, flag)| state.contains(*flag))
        .map(|(name, _)| *name)
        .collect();
    if state.contains(StateMask::UNDETECTED) {
        names.push(UNDETECTED_STATE);
    }
    names.join(",")
}

/// Recognized condition names, in bit order.
pub fn vocabulary() -> impl Iterator<Item = &'static str> {
    VOCABULARY.iter().map(|(name, _)| *name)
}
