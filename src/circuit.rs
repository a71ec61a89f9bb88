/*!

  The node model: constants, combinational gates, latches and clocks.

*/

use crate::parameter::Parameter;
use bitvec::vec::BitVec;
use std::time::Duration;

/// An identifier labelling a node in a netlist
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    /// The name of the identifier
    name: String,
}

impl Identifier {
    /// Creates a new identifier with the given name
    pub fn new(name: String) -> Self {
        Self { name }
    }

    /// Returns the name of the identifier
    pub fn get_name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Self::new(name.to_string())
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Which boolean function a gate computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// `a && b`
    And,
    /// `a || b`
    Or,
    /// `!a`
    Not,
    /// `!(a && b)`
    Nand,
    /// `a != b`
    Xor,
    /// `!(a || b)`
    Nor,
    /// `a == b`
    Xnor,
}

impl Combinator {
    /// Every combinator, in declaration order
    pub const ALL: [Combinator; 7] = [
        Combinator::And,
        Combinator::Or,
        Combinator::Not,
        Combinator::Nand,
        Combinator::Xor,
        Combinator::Nor,
        Combinator::Xnor,
    ];

    /// Returns the number of inputs the combinator reads
    pub fn arity(&self) -> usize {
        match self {
            Combinator::Not => 1,
            _ => 2,
        }
    }

    /// Returns the value substituted for an unbound input.
    /// NAND is the only combinator that reads an open pin as high.
    pub fn neutral_default(&self) -> bool {
        matches!(self, Combinator::Nand)
    }

    /// Applies the combinator. Unary combinators ignore `b`.
    pub fn apply(&self, a: bool, b: bool) -> bool {
        match self {
            Combinator::And => a && b,
            Combinator::Or => a || b,
            Combinator::Not => !a,
            Combinator::Nand => !(a && b),
            Combinator::Xor => a != b,
            Combinator::Nor => !(a || b),
            Combinator::Xnor => a == b,
        }
    }

    /// Returns the truth table of the combinator, indexed by `a | b << 1`
    pub fn truth_table(&self) -> BitVec {
        (0..(1usize << self.arity()))
            .map(|i| self.apply(i & 1 != 0, i & 2 != 0))
            .collect()
    }

    /// Returns the keyword used when printing the combinator
    pub fn keyword(&self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
            Combinator::Not => "NOT",
            Combinator::Nand => "NAND",
            Combinator::Xor => "XOR",
            Combinator::Nor => "NOR",
            Combinator::Xnor => "XNOR",
        }
    }
}

impl std::fmt::Display for Combinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

impl std::str::FromStr for Combinator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Combinator::ALL
            .into_iter()
            .find(|c| c.keyword().eq_ignore_ascii_case(s))
            .ok_or(format!("Unknown combinator `{s}`"))
    }
}

/// The clock gating attached to a combinational gate.
/// Without a clock the gate is a plain pass-through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Latch<C> {
    clock: Option<C>,
    last: bool,
}

impl<C> Latch<C>
where
    C: Copy,
{
    /// Returns the clock gating this latch, if any
    pub fn get_clock(&self) -> Option<C> {
        self.clock
    }

    /// Replaces the clock gating this latch
    pub fn set_clock(&mut self, clock: Option<C>) {
        self.clock = clock;
    }

    /// Returns the last value recorded while the clock was high
    pub fn last(&self) -> bool {
        self.last
    }

    /// Returns the held value while the clock is low.
    /// `None` means the latch is transparent and the gate must be recomputed.
    pub fn held(&self, clock_high: Option<bool>) -> Option<bool> {
        match clock_high {
            Some(false) => Some(self.last),
            _ => None,
        }
    }

    /// Records a freshly computed value. Only a high clock stores it.
    pub fn record(&mut self, clock_high: Option<bool>, value: bool) {
        if clock_high == Some(true) {
            self.last = value;
        }
    }
}

/// A gate reading up to two inputs, optionally clock-gated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate<H> {
    kind: Combinator,
    inputs: [Option<H>; 2],
    latch: Latch<H>,
}

impl<H> Gate<H>
where
    H: Copy,
{
    /// Creates a gate with unbound inputs and no clock
    pub fn new(kind: Combinator) -> Self {
        Self {
            kind,
            inputs: [None, None],
            latch: Latch {
                clock: None,
                last: false,
            },
        }
    }

    /// Returns the combinator the gate computes
    pub fn get_kind(&self) -> Combinator {
        self.kind
    }

    /// Returns the bound inputs, one entry per pin
    pub fn get_inputs(&self) -> &[Option<H>] {
        &self.inputs[..self.kind.arity()]
    }

    /// Rebinds every pin at once. `inputs` must match the arity.
    pub(crate) fn set_inputs(&mut self, inputs: &[H]) {
        debug_assert_eq!(inputs.len(), self.kind.arity());
        self.inputs = [inputs.first().copied(), inputs.get(1).copied()];
    }

    /// Returns every pin to the unbound state
    pub(crate) fn clear_inputs(&mut self) {
        self.inputs = [None, None];
    }

    /// Returns the latch wrapping the gate
    pub fn get_latch(&self) -> &Latch<H> {
        &self.latch
    }

    /// Returns the latch wrapping the gate mutably
    pub(crate) fn get_latch_mut(&mut self) -> &mut Latch<H> {
        &mut self.latch
    }

    /// Rewrites every handle the gate holds, inputs and clock alike
    pub(crate) fn map_handles(&mut self, f: impl Fn(H) -> H) {
        for input in self.inputs.iter_mut() {
            *input = input.map(&f);
        }
        self.latch.clock = self.latch.clock.map(&f);
    }
}

/// The state of a clock node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clock {
    high: bool,
    interval: Duration,
}

impl Clock {
    /// Creates a clock that starts low
    pub fn new(interval: Duration) -> Self {
        Self {
            high: false,
            interval,
        }
    }

    /// Returns `true` while the clock is high
    pub fn is_high(&self) -> bool {
        self.high
    }

    /// Returns the time a driver should wait between advances
    pub fn get_interval(&self) -> Duration {
        self.interval
    }

    /// Flips the clock
    pub fn advance(&mut self) {
        self.high = !self.high;
    }
}

/// A tagged union over every kind of node in a netlist.
/// `H` is the handle type used to refer to other nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object<H> {
    /// A fixed boolean source
    Constant(bool),
    /// A combinational gate, possibly latched
    Gate(Gate<H>),
    /// A clock source
    Clock(Clock),
}

impl<H> Object<H>
where
    H: Copy,
{
    /// Returns the gate within the object, if the object represents one
    pub fn get_gate(&self) -> Option<&Gate<H>> {
        match self {
            Object::Gate(gate) => Some(gate),
            _ => None,
        }
    }

    /// Returns the gate within the object mutably, if the object represents one
    pub fn get_gate_mut(&mut self) -> Option<&mut Gate<H>> {
        match self {
            Object::Gate(gate) => Some(gate),
            _ => None,
        }
    }

    /// Returns the clock within the object, if the object represents one
    pub fn get_clock(&self) -> Option<&Clock> {
        match self {
            Object::Clock(clock) => Some(clock),
            _ => None,
        }
    }

    /// Returns the keyword used when printing the object
    pub fn keyword(&self) -> &'static str {
        match self {
            Object::Constant(_) => "const",
            Object::Gate(gate) => gate.get_kind().keyword(),
            Object::Clock(_) => "clock",
        }
    }

    /// Returns the parameter describing the object
    pub fn parameter(&self) -> Parameter {
        match self {
            Object::Constant(v) => Parameter::Level(*v),
            Object::Gate(gate) => Parameter::TruthTable(gate.get_kind().truth_table()),
            Object::Clock(clock) => Parameter::Period(clock.get_interval()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truth_tables() {
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            assert_eq!(Combinator::And.apply(a, b), a && b);
            assert_eq!(Combinator::Or.apply(a, b), a || b);
            assert_eq!(Combinator::Nand.apply(a, b), !(a && b));
            assert_eq!(Combinator::Xor.apply(a, b), a ^ b);
            assert_eq!(Combinator::Nor.apply(a, b), !(a || b));
            assert_eq!(Combinator::Xnor.apply(a, b), !(a ^ b));
            assert_eq!(Combinator::Not.apply(a, b), !a);
        }
    }

    #[test]
    fn neutral_defaults() {
        for c in Combinator::ALL {
            assert_eq!(c.neutral_default(), c == Combinator::Nand, "{c}");
        }
    }

    #[test]
    fn packed_truth_table() {
        let and: Vec<bool> = Combinator::And.truth_table().iter().by_vals().collect();
        assert_eq!(and, vec![false, false, false, true]);
        let not: Vec<bool> = Combinator::Not.truth_table().iter().by_vals().collect();
        assert_eq!(not, vec![true, false]);
    }

    #[test]
    fn parse_keywords() {
        for c in Combinator::ALL {
            assert_eq!(c.to_string().parse::<Combinator>(), Ok(c));
            assert_eq!(c.keyword().to_lowercase().parse::<Combinator>(), Ok(c));
        }
        assert!("MUX".parse::<Combinator>().is_err());
    }

    #[test]
    fn clock_toggles() {
        let mut clock = Clock::new(Duration::from_millis(1));
        for n in 1..=8 {
            clock.advance();
            assert_eq!(clock.is_high(), n % 2 == 1);
        }
    }

    #[test]
    fn latch_holds_while_low() {
        let mut latch: Latch<usize> = Latch::default();
        assert_eq!(latch.held(Some(false)), Some(false));
        assert_eq!(latch.held(Some(true)), None);
        latch.record(Some(true), true);
        assert_eq!(latch.held(Some(false)), Some(true));
        // pass-through does not overwrite the held value
        latch.record(None, false);
        assert_eq!(latch.held(None), None);
        assert!(latch.last());
    }
}
