use crate::json;
use crate::Error;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// A parameter number, bounded by `ParameterPosition::MAX` so that argument
/// roots never alias a sentinel root.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ParameterPosition(u32);

impl ParameterPosition {
    /// The largest parameter position.
    pub const MAX: u32 = u32::MAX - 8;

    /// Returns `None` above `ParameterPosition::MAX`.
    pub fn new(position: u32) -> Option<ParameterPosition> {
        if position <= ParameterPosition::MAX {
            Some(ParameterPosition(position))
        } else {
            None
        }
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ParameterPosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a non-negative decimal parameter position.
///
/// Signs, whitespace, trailing characters and positions past
/// `ParameterPosition::MAX` are all rejected.
pub fn parse_parameter_position(value: &str) -> Option<ParameterPosition> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse::<u32>().ok().and_then(ParameterPosition::new)
}

/// The start of an access path: an argument, the return value, or one of the
/// synthetic anchors used for leaf frames, cross-repository flows and call
/// effects.
///
/// Roots are ordered by their integer encoding. Arguments occupy
/// `0..=Root::MAX_ARGUMENT`, and every other root is a sentinel at the top of
/// the `u32` range, so `is_argument` is a single comparison.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Root {
    Argument(ParameterPosition),
    Return,
    /// Callee port of a leaf frame.
    Leaf,
    /// Connection point to another codebase, detected here.
    Anchor,
    /// Connection point to another codebase, detected by another analyzer.
    Producer,
    /// `this` as other analyzers number it (argument -1). Never an argument,
    /// never read from configuration.
    CanonicalThis,
    CallEffectCallChain,
    CallEffectExploitability,
    CallEffectIntent,
}

impl Root {
    const RETURN: u32 = u32::MAX;
    const LEAF: u32 = u32::MAX - 1;
    const ANCHOR: u32 = u32::MAX - 2;
    const PRODUCER: u32 = u32::MAX - 3;
    const CANONICAL_THIS: u32 = u32::MAX - 4;
    const CALL_EFFECT_CALL_CHAIN: u32 = u32::MAX - 5;
    const CALL_EFFECT_EXPLOITABILITY: u32 = u32::MAX - 6;
    const CALL_EFFECT_INTENT: u32 = u32::MAX - 7;

    /// The largest parameter position an argument root can hold.
    pub const MAX_ARGUMENT: u32 = ParameterPosition::MAX;

    /// Panics above `Root::MAX_ARGUMENT`.
    pub fn argument(position: u32) -> Root {
        match ParameterPosition::new(position) {
            Some(position) => Root::Argument(position),
            None => panic!("parameter position {} collides with a sentinel root", position),
        }
    }

    /// The raw integer encoding of this root.
    pub fn encode(&self) -> u32 {
        match *self {
            Root::Argument(position) => position.value(),
            Root::Return => Root::RETURN,
            Root::Leaf => Root::LEAF,
            Root::Anchor => Root::ANCHOR,
            Root::Producer => Root::PRODUCER,
            Root::CanonicalThis => Root::CANONICAL_THIS,
            Root::CallEffectCallChain => Root::CALL_EFFECT_CALL_CHAIN,
            Root::CallEffectExploitability => Root::CALL_EFFECT_EXPLOITABILITY,
            Root::CallEffectIntent => Root::CALL_EFFECT_INTENT,
        }
    }

    /// Inverse of `encode`. Values between the last argument and the first
    /// sentinel do not name a root.
    pub fn decode(encoding: u32) -> Option<Root> {
        if let Some(position) = ParameterPosition::new(encoding) {
            return Some(Root::Argument(position));
        }
        match encoding {
            Root::RETURN => Some(Root::Return),
            Root::LEAF => Some(Root::Leaf),
            Root::ANCHOR => Some(Root::Anchor),
            Root::PRODUCER => Some(Root::Producer),
            Root::CANONICAL_THIS => Some(Root::CanonicalThis),
            Root::CALL_EFFECT_CALL_CHAIN => Some(Root::CallEffectCallChain),
            Root::CALL_EFFECT_EXPLOITABILITY => Some(Root::CallEffectExploitability),
            Root::CALL_EFFECT_INTENT => Some(Root::CallEffectIntent),
            _ => None,
        }
    }

    pub fn is_argument(&self) -> bool {
        matches!(self, Root::Argument(_))
    }

    pub fn is_return(&self) -> bool {
        *self == Root::Return
    }

    pub fn is_leaf(&self) -> bool {
        *self == Root::Leaf
    }

    pub fn is_anchor(&self) -> bool {
        *self == Root::Anchor
    }

    pub fn is_producer(&self) -> bool {
        *self == Root::Producer
    }

    /// Is this used as the callee port of a leaf frame?
    pub fn is_leaf_port(&self) -> bool {
        matches!(self, Root::Leaf | Root::Anchor | Root::Producer)
    }

    pub fn is_call_effect(&self) -> bool {
        matches!(
            self,
            Root::CallEffectCallChain | Root::CallEffectExploitability | Root::CallEffectIntent
        )
    }

    pub fn is_call_chain_exploitability(&self) -> bool {
        *self == Root::CallEffectExploitability
    }

    /// Call effect ports which only feed intraprocedural propagation inputs.
    pub fn is_call_effect_for_local_propagation_input(&self) -> bool {
        *self == Root::CallEffectIntent
    }

    /// Panics if this root is not an argument.
    pub fn parameter_position(&self) -> ParameterPosition {
        match *self {
            Root::Argument(position) => position,
            _ => panic!("{} is not an argument root", self),
        }
    }

    /// Parse the textual form of a root, as produced by `to_string`.
    ///
    /// `Argument(-1)` is rejected: `CanonicalThis` cannot be configured.
    pub fn parse(value: &str) -> Result<Root, Error> {
        if value.starts_with("Argument(") && value.ends_with(')') && value.len() >= 11 {
            return match parse_parameter_position(&value[9..value.len() - 1]) {
                Some(position) => Ok(Root::Argument(position)),
                None => Err(Error::json_validation(
                    value,
                    None,
                    format!("`Argument(<number>)` for access path root, got `{}`", value),
                )),
            };
        }
        match value {
            "Return" => Ok(Root::Return),
            "Leaf" => Ok(Root::Leaf),
            "Anchor" => Ok(Root::Anchor),
            "Producer" => Ok(Root::Producer),
            "call-chain" => Ok(Root::CallEffectCallChain),
            "call-chain-exploitability" => Ok(Root::CallEffectExploitability),
            "call-effect-intent" => Ok(Root::CallEffectIntent),
            _ => Err(Error::json_validation(
                value,
                None,
                "valid access path root (`Return`, `Argument(...)`, `Leaf`, `Anchor`, `Producer`, \
                 `call-chain`, `call-chain-exploitability` or `call-effect-intent`)",
            )),
        }
    }

    pub fn from_json(value: &Value) -> Result<Root, Error> {
        Root::parse(json::string(value)?)
    }

    pub fn to_json(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl Ord for Root {
    fn cmp(&self, other: &Self) -> Ordering {
        self.encode().cmp(&other.encode())
    }
}

impl PartialOrd for Root {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Root::Argument(position) => write!(f, "Argument({})", position),
            Root::Return => write!(f, "Return"),
            Root::Leaf => write!(f, "Leaf"),
            Root::Anchor => write!(f, "Anchor"),
            Root::Producer => write!(f, "Producer"),
            Root::CanonicalThis => write!(f, "Argument(-1)"),
            Root::CallEffectCallChain => write!(f, "call-chain"),
            Root::CallEffectExploitability => write!(f, "call-chain-exploitability"),
            Root::CallEffectIntent => write!(f, "call-effect-intent"),
        }
    }
}
