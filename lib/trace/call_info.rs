use crate::access::AccessPath;
use crate::json;
use crate::method::{Method, Position};
use crate::trace::CallKind;
use crate::Error;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

/// One hop of a trace: the callee reached, the stage of the frame, the port
/// of the callee the taint flows through, and the position of the call.
///
/// A callee is only ever attached to call site frames, and always together
/// with a port. Leaf frames have no callee, but may carry the position of the
/// expression that introduced or consumed the taint.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CallInfo {
    callee: Option<Method>,
    call_kind: CallKind,
    callee_port: Option<AccessPath>,
    call_position: Option<Position>,
}

impl CallInfo {
    /// Create a new `CallInfo`.
    ///
    /// Panics if a callee is given without a port, or for a frame which is
    /// not a call site.
    pub fn new(
        callee: Option<Method>,
        call_kind: CallKind,
        callee_port: Option<AccessPath>,
        call_position: Option<Position>,
    ) -> CallInfo {
        if let Some(ref callee) = callee {
            assert!(
                callee_port.is_some(),
                "callee `{}` requires a callee port",
                callee
            );
            assert!(
                call_kind.is_callsite(),
                "callee `{}` requires a call site frame, got {}",
                callee,
                call_kind
            );
        }
        CallInfo {
            callee,
            call_kind,
            callee_port,
            call_position,
        }
    }

    /// A declaration frame with nothing attached yet.
    pub fn make_default() -> CallInfo {
        CallInfo::new(None, CallKind::declaration(), None, None)
    }

    pub fn callee(&self) -> Option<&Method> {
        self.callee.as_ref()
    }

    pub fn call_kind(&self) -> CallKind {
        self.call_kind
    }

    pub fn callee_port(&self) -> Option<&AccessPath> {
        self.callee_port.as_ref()
    }

    pub fn call_position(&self) -> Option<&Position> {
        self.call_position.as_ref()
    }

    pub fn is_default(&self) -> bool {
        self.callee.is_none()
            && self.call_kind.is_declaration()
            && self.callee_port.is_none()
            && self.call_position.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.call_kind.is_origin()
    }

    /// The frame one call further away from the leaf.
    ///
    /// A leaf on a cross-repository anchor port has its port rewritten into
    /// the canonical form of `callee`. Declarations lose their callee.
    ///
    /// Panics on bare propagation frames, and on anchor leaves propagated
    /// without a callee or port.
    pub fn propagate(
        &self,
        callee: Option<Method>,
        callee_port: Option<AccessPath>,
        call_position: Option<Position>,
    ) -> CallInfo {
        assert!(
            !self.call_kind.is_propagation_without_trace(),
            "cannot propagate a propagation frame"
        );

        let is_anchor_leaf = self
            .callee_port
            .as_ref()
            .map(|port| port.root().is_anchor() && port.path().is_empty())
            .unwrap_or(false);

        let callee_port = if is_anchor_leaf {
            match (callee.as_ref(), callee_port.as_ref()) {
                (Some(callee), Some(port)) => Some(port.canonicalize_for_method(callee)),
                _ => panic!("anchor leaf propagated without a callee and port"),
            }
        } else {
            callee_port
        };

        let callee = if self.call_kind.is_declaration() {
            None
        } else {
            callee
        };

        CallInfo::new(callee, self.call_kind.propagate(), callee_port, call_position)
    }

    pub fn to_json(&self) -> Value {
        let mut call_info = Map::new();
        call_info.insert(
            "call_kind".to_string(),
            Value::String(self.call_kind.to_trace_string()),
        );
        if let Some(ref callee) = self.callee {
            call_info.insert("resolves_to".to_string(), callee.to_json());
        }
        if let Some(ref position) = self.call_position {
            call_info.insert("position".to_string(), position.to_json());
        }
        if let Some(ref port) = self.callee_port {
            call_info.insert("port".to_string(), port.to_json());
        }

        let mut result = Map::new();
        result.insert("call_info".to_string(), Value::Object(call_info));
        Value::Object(result)
    }

    pub fn from_json(value: &Value) -> Result<CallInfo, Error> {
        let call_info = Value::Object(json::object_field(value, "call_info")?.clone());
        let call_kind = CallKind::from_trace_string(json::string_field(&call_info, "call_kind")?)?;
        let callee = call_info.get("resolves_to").map(Method::from_json).transpose()?;
        let call_position = call_info.get("position").map(Position::from_json).transpose()?;
        let callee_port = call_info.get("port").map(AccessPath::from_json).transpose()?;

        if callee.is_some() && (callee_port.is_none() || !call_kind.is_callsite()) {
            return Err(Error::json_validation(
                call_info.to_string(),
                Some("resolves_to"),
                "a callee only on call site frames with a port",
            ));
        }

        Ok(CallInfo::new(callee, call_kind, callee_port, call_position))
    }
}

impl Default for CallInfo {
    fn default() -> CallInfo {
        CallInfo::make_default()
    }
}

impl Ord for CallInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.call_kind
            .encode()
            .cmp(&other.call_kind.encode())
            .then_with(|| self.callee_port.cmp(&other.callee_port))
            .then_with(|| self.call_position.cmp(&other.call_position))
            .then_with(|| self.callee.cmp(&other.callee))
    }
}

impl PartialOrd for CallInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CallInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_default() {
            return write!(f, "CallInfo()");
        }
        let show = |value: Option<String>| value.unwrap_or_else(|| "null".to_string());
        write!(
            f,
            "CallInfo(callee=`{}`, call_kind={}, callee_port={}, call_position={})",
            show(self.callee.as_ref().map(|callee| callee.to_string())),
            self.call_kind,
            show(self.callee_port.as_ref().map(|port| port.to_string())),
            show(self.call_position.as_ref().map(|position| position.to_string()))
        )
    }
}
