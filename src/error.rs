/*!

  Errors produced while wiring, evaluating, or simulating a netlist.

*/

use crate::circuit::Identifier;
use thiserror::Error;

/// Errors that can occur while working with a [crate::netlist::Netlist].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A handle was used with a netlist other than the one that created it.
    #[error("node handle {id} does not belong to netlist `{netlist}`")]
    ForeignHandle {
        /// The printed handle
        id: String,
        /// The name of the netlist it was used with
        netlist: String,
    },
    /// Inputs or a clock were bound to a node that is not a gate.
    #[error("`{node}` is not a gate")]
    NotAGate {
        /// The node that was targeted
        node: Identifier,
    },
    /// A clock operation reached a node that is not a clock.
    #[error("`{node}` is not a clock")]
    NotAClock {
        /// The node that was targeted
        node: Identifier,
    },
    /// The number of inputs does not match the gate's arity.
    #[error("gate `{gate}` takes {expected} input(s), got {found}")]
    ArityMismatch {
        /// The gate that was targeted
        gate: Identifier,
        /// Arity of the gate's combinator
        expected: usize,
        /// Number of inputs supplied
        found: usize,
    },
    /// Evaluation re-entered a node that was already being evaluated.
    #[error("combinational loop through `{node}`")]
    CombinationalLoop {
        /// The first node found on the loop
        node: Identifier,
    },
    /// The simulator was configured with unusable settings.
    #[error("invalid simulator config: {0}")]
    Config(String),
}

/// Shorthand for results carrying an [Error].
pub type Result<T> = std::result::Result<T, Error>;
