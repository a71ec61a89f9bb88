/*!

  Parameters describing the nodes in a netlist.

*/

use bitvec::vec::BitVec;
use std::time::Duration;

/// A dedicated type to parameters for nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    /// The level a constant drives
    Level(bool),
    /// The time a driver waits between clock advances
    Period(Duration),
    /// A gate's truth table, indexed by its packed inputs
    TruthTable(BitVec),
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parameter::Level(v) => write!(f, "1'b{}", u8::from(*v)),
            Parameter::Period(d) => write!(f, "{}ms", d.as_millis()),
            Parameter::TruthTable(bv) => write!(
                f,
                "{}'b{}",
                bv.len(),
                bv.iter()
                    .rev()
                    .map(|b| if *b { '1' } else { '0' })
                    .collect::<String>()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Combinator;

    #[test]
    fn display() {
        assert_eq!(Parameter::Level(true).to_string(), "1'b1");
        assert_eq!(
            Parameter::Period(Duration::from_millis(250)).to_string(),
            "250ms"
        );
        let and = Parameter::TruthTable(Combinator::And.truth_table());
        assert_eq!(and.to_string(), "4'b1000");
        let nand = Parameter::TruthTable(Combinator::Nand.truth_table());
        assert_eq!(nand.to_string(), "4'b0111");
        let not = Parameter::TruthTable(Combinator::Not.truth_table());
        assert_eq!(not.to_string(), "2'b01");
    }
}
