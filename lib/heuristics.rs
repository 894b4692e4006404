//! Depth bounds of the access-path lattice.
//!
//! The analysis truncates every port it stores to one of these bounds, which
//! keeps the lattice of access paths finite however deep the analyzed code
//! nests its fields.

use crate::access::AccessPath;
use crate::json;
use crate::Error;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which bound applies to a port.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PortRole {
    Generation,
    ParameterSource,
    Sink,
    CallEffectSource,
    CallEffectSink,
    PropagationInput,
    PropagationOutput,
}

/// Analysis heuristics. Missing keys take their default, unknown keys are
/// rejected.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Heuristics {
    pub source_sink_tree_widening_height: usize,
    pub generation_max_port_size: usize,
    pub parameter_source_max_port_size: usize,
    pub sink_max_port_size: usize,
    pub call_effect_source_max_port_size: usize,
    pub call_effect_sink_max_port_size: usize,
    pub propagation_max_input_path_size: usize,
    pub propagation_max_output_path_size: usize,
    pub propagation_max_collapse_depth: usize,
}

impl Default for Heuristics {
    fn default() -> Heuristics {
        Heuristics {
            source_sink_tree_widening_height: 4,
            generation_max_port_size: 4,
            parameter_source_max_port_size: 4,
            sink_max_port_size: 4,
            call_effect_source_max_port_size: 4,
            call_effect_sink_max_port_size: 4,
            propagation_max_input_path_size: 4,
            propagation_max_output_path_size: 4,
            propagation_max_collapse_depth: 4,
        }
    }
}

impl Heuristics {
    pub fn new() -> Heuristics {
        Heuristics::default()
    }

    pub fn from_json(value: &Value) -> Result<Heuristics, Error> {
        let mut heuristics: Heuristics = json::deserialize(value)?;
        heuristics.enforce_consistency();
        Ok(heuristics)
    }

    /// The collapse depth of propagations may not exceed either propagation
    /// path size, and is clamped if it does. Widening heights above a port
    /// size are allowed but reported.
    pub fn enforce_consistency(&mut self) {
        let max_propagation_path_size = self
            .propagation_max_input_path_size
            .min(self.propagation_max_output_path_size);
        if self.propagation_max_collapse_depth > max_propagation_path_size {
            warn!(
                "propagation_max_collapse_depth ({}) is greater than \
                 propagation_max_input_path_size ({}) and/or \
                 propagation_max_output_path_size ({}). Updating \
                 propagation_max_collapse_depth to the minimum of the two.",
                self.propagation_max_collapse_depth,
                self.propagation_max_input_path_size,
                self.propagation_max_output_path_size
            );
            self.propagation_max_collapse_depth = max_propagation_path_size;
        }

        let port_sizes = [
            ("generation_max_port_size", self.generation_max_port_size),
            ("sink_max_port_size", self.sink_max_port_size),
            ("parameter_source_max_port_size", self.parameter_source_max_port_size),
            ("call_effect_source_max_port_size", self.call_effect_source_max_port_size),
            ("call_effect_sink_max_port_size", self.call_effect_sink_max_port_size),
            ("propagation_max_input_path_size", self.propagation_max_input_path_size),
        ];
        for (name, size) in port_sizes.iter() {
            if self.source_sink_tree_widening_height > *size {
                warn!(
                    "source_sink_tree_widening_height ({}) > {} ({}). \
                     The final model may not be as expected.",
                    self.source_sink_tree_widening_height, name, size
                );
            }
        }
    }

    pub fn max_port_size(&self, role: PortRole) -> usize {
        match role {
            PortRole::Generation => self.generation_max_port_size,
            PortRole::ParameterSource => self.parameter_source_max_port_size,
            PortRole::Sink => self.sink_max_port_size,
            PortRole::CallEffectSource => self.call_effect_source_max_port_size,
            PortRole::CallEffectSink => self.call_effect_sink_max_port_size,
            PortRole::PropagationInput => self.propagation_max_input_path_size,
            PortRole::PropagationOutput => self.propagation_max_output_path_size,
        }
    }

    /// Truncate the path of `port` to the bound for `role`.
    pub fn truncate_port(&self, port: &mut AccessPath, role: PortRole) {
        port.truncate(self.max_port_size(role));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let heuristics = Heuristics::from_json(&json!({})).unwrap();
        assert_eq!(heuristics, Heuristics::default());
        assert_eq!(heuristics.max_port_size(PortRole::Sink), 4);
    }

    #[test]
    fn overrides_and_unknown_keys() {
        let heuristics = Heuristics::from_json(&json!({"sink_max_port_size": 2})).unwrap();
        assert_eq!(heuristics.sink_max_port_size, 2);
        assert_eq!(heuristics.generation_max_port_size, 4);
        match Heuristics::from_json(&json!({"max_port_size": 2})) {
            Err(Error::JsonValidation { value, expected, .. }) => {
                assert_eq!(value, r#"{"max_port_size":2}"#);
                assert!(expected.contains("max_port_size"));
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(matches!(
            Heuristics::from_json(&json!({"sink_max_port_size": -1})),
            Err(Error::JsonValidation { .. })
        ));
    }

    #[test]
    fn collapse_depth_is_clamped() {
        let heuristics = Heuristics::from_json(&json!({
            "propagation_max_input_path_size": 2,
            "propagation_max_collapse_depth": 8,
        }))
        .unwrap();
        assert_eq!(heuristics.propagation_max_collapse_depth, 2);
    }

    #[test]
    fn truncate_port() {
        let heuristics = Heuristics::from_json(&json!({"generation_max_port_size": 1})).unwrap();
        let mut port = AccessPath::from_string("Return.x.y.z").unwrap();
        heuristics.truncate_port(&mut port, PortRole::Generation);
        assert_eq!(port.to_string(), "Return.x");

        let mut port = AccessPath::from_string("Argument(0).x").unwrap();
        heuristics.truncate_port(&mut port, PortRole::Sink);
        assert_eq!(port.to_string(), "Argument(0).x");
    }
}
