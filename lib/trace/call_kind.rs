use crate::Error;
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Provenance stage of a frame in a trace.
    ///
    /// The low two bits hold one of `DECLARATION`, `ORIGIN`, `CALL_SITE` or
    /// `PROPAGATION`. `PROPAGATION_WITH_TRACE` may be set on top of the first
    /// three, never on `PROPAGATION`.
    pub struct CallKind: u32 {
        const DECLARATION            = 0b000;
        const ORIGIN                 = 0b001;
        const CALL_SITE              = 0b010;
        const PROPAGATION            = 0b011;
        const PROPAGATION_WITH_TRACE = 0b100;
    }
}

const TRACE_PREFIX: &str = "PropagationWithTrace:";

impl CallKind {
    pub fn declaration() -> CallKind {
        CallKind::DECLARATION
    }

    pub fn origin() -> CallKind {
        CallKind::ORIGIN
    }

    pub fn callsite() -> CallKind {
        CallKind::CALL_SITE
    }

    pub fn propagation() -> CallKind {
        CallKind::PROPAGATION
    }

    /// Panics unless `kind` is one of declaration, origin or call site.
    pub fn propagation_with_trace(kind: CallKind) -> CallKind {
        assert!(
            kind == CallKind::DECLARATION
                || kind == CallKind::ORIGIN
                || kind == CallKind::CALL_SITE,
            "invalid base kind {:?} for propagation with trace",
            kind
        );
        kind | CallKind::PROPAGATION_WITH_TRACE
    }

    pub fn encode(&self) -> u32 {
        self.bits()
    }

    /// Panics on encodings which combine the trace bit with bare propagation,
    /// or set unknown bits.
    pub fn decode(encoding: u32) -> CallKind {
        let kind = match CallKind::from_bits(encoding) {
            Some(kind) => kind,
            None => panic!("invalid call kind encoding {:#b}", encoding),
        };
        assert!(
            !kind.contains(CallKind::PROPAGATION | CallKind::PROPAGATION_WITH_TRACE),
            "invalid call kind encoding {:#b}",
            encoding
        );
        kind
    }

    fn base(&self) -> CallKind {
        self.difference(CallKind::PROPAGATION_WITH_TRACE)
    }

    pub fn is_declaration(&self) -> bool {
        self.base() == CallKind::DECLARATION
    }

    pub fn is_origin(&self) -> bool {
        self.base() == CallKind::ORIGIN
    }

    pub fn is_callsite(&self) -> bool {
        self.base() == CallKind::CALL_SITE
    }

    pub fn is_propagation(&self) -> bool {
        self.is_propagation_without_trace() || self.is_propagation_with_trace()
    }

    pub fn is_propagation_with_trace(&self) -> bool {
        self.contains(CallKind::PROPAGATION_WITH_TRACE)
    }

    pub fn is_propagation_without_trace(&self) -> bool {
        *self == CallKind::PROPAGATION
    }

    /// The kind of the next frame of a trace.
    ///
    /// `DECLARATION` becomes `ORIGIN` and every later stage is `CALL_SITE`.
    /// The trace bit is kept. Bare propagation does not move.
    pub fn propagate(&self) -> CallKind {
        if self.is_propagation_without_trace() {
            return *self;
        }

        let next = if self.is_declaration() {
            CallKind::ORIGIN
        } else {
            CallKind::CALL_SITE
        };
        next | (*self & CallKind::PROPAGATION_WITH_TRACE)
    }

    pub fn from_trace_string(value: &str) -> Result<CallKind, Error> {
        let (with_trace, base) = match value.strip_prefix(TRACE_PREFIX) {
            Some(base) => (true, base),
            None => (false, value),
        };
        let kind = match base {
            "Declaration" => CallKind::DECLARATION,
            "Origin" => CallKind::ORIGIN,
            "CallSite" => CallKind::CALL_SITE,
            "Propagation" if !with_trace => CallKind::PROPAGATION,
            _ => {
                return Err(Error::json_validation(
                    value,
                    None,
                    "CallKind should be a [PropagationWithTrace:][Declaration|Origin|CallSite], \
                     or just Propagation",
                ))
            }
        };
        if with_trace {
            Ok(kind | CallKind::PROPAGATION_WITH_TRACE)
        } else {
            Ok(kind)
        }
    }

    pub fn to_trace_string(&self) -> String {
        let base = if self.is_declaration() {
            "Declaration"
        } else if self.is_origin() {
            "Origin"
        } else if self.is_callsite() {
            "CallSite"
        } else {
            "Propagation"
        };
        if self.is_propagation_with_trace() {
            format!("{}{}", TRACE_PREFIX, base)
        } else {
            base.to_string()
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_trace_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn propagate_collapses_at_call_site() {
        let kind = CallKind::declaration();
        let once = kind.propagate();
        assert!(once.is_origin());
        let twice = once.propagate();
        assert!(twice.is_callsite());
        let thrice = twice.propagate();
        assert!(thrice.is_callsite());
        assert_eq!(thrice.propagate(), thrice);
    }

    #[test]
    fn propagate_keeps_trace_bit() {
        let mut kind = CallKind::propagation_with_trace(CallKind::declaration());
        assert!(kind.is_declaration());
        for _ in 0..4 {
            assert!(kind.is_propagation_with_trace());
            assert!(kind.is_propagation());
            kind = kind.propagate();
        }
        assert!(kind.is_callsite());
        assert!(kind.is_propagation_with_trace());
    }

    #[test]
    fn propagation_is_a_fixed_point() {
        let kind = CallKind::propagation();
        assert!(kind.is_propagation_without_trace());
        assert!(!kind.is_origin());
        assert!(!kind.is_callsite());
        assert_eq!(kind.propagate(), kind);
    }

    #[test]
    fn trace_strings() {
        let kinds = vec![
            CallKind::declaration(),
            CallKind::origin(),
            CallKind::callsite(),
            CallKind::propagation(),
            CallKind::propagation_with_trace(CallKind::declaration()),
            CallKind::propagation_with_trace(CallKind::origin()),
            CallKind::propagation_with_trace(CallKind::callsite()),
        ];
        for kind in kinds {
            assert_eq!(CallKind::from_trace_string(&kind.to_trace_string()).unwrap(), kind);
        }
        assert_eq!(
            CallKind::propagation_with_trace(CallKind::callsite()).to_trace_string(),
            "PropagationWithTrace:CallSite"
        );
        assert!(CallKind::from_trace_string("PropagationWithTrace:Propagation").is_err());
        assert!(CallKind::from_trace_string("Callsite").is_err());
        assert!(CallKind::from_trace_string("").is_err());
    }

    #[test]
    fn encoding() {
        assert_eq!(CallKind::origin().encode(), 0b001);
        assert_eq!(CallKind::decode(0b110), CallKind::propagation_with_trace(CallKind::callsite()));
    }

    #[test]
    #[should_panic]
    fn decode_rejects_traced_propagation() {
        CallKind::decode(0b111);
    }

    #[test]
    #[should_panic]
    fn propagation_with_trace_of_propagation() {
        CallKind::propagation_with_trace(CallKind::propagation());
    }
}
