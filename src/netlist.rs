/*!

  API for a netlist of constants, gates and clocks.

  Every node lives in a [Netlist] arena and refers to the nodes it reads
  through [NodeId] handles. Handles never own anything: the netlist does.

*/

use crate::{
    circuit::{Clock, Combinator, Gate, Identifier, Object},
    error::{Error, Result},
    graph::Analysis,
};
use log::{debug, trace, warn};
use std::{
    collections::HashSet,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

/// Hands out a fresh identity to every netlist
static NETLIST_IDS: AtomicUsize = AtomicUsize::new(0);

/// A handle to a node in a [Netlist]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    /// The identity of the owning netlist
    netlist: usize,
    /// The index of the node within the netlist
    index: usize,
}

impl NodeId {
    /// Returns the index of the node within its netlist
    pub fn index(&self) -> usize {
        self.index
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// A handle to a node that is known to be a clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockId(NodeId);

impl ClockId {
    /// Returns the plain node handle
    pub fn node(&self) -> NodeId {
        self.0
    }
}

impl From<ClockId> for NodeId {
    fn from(val: ClockId) -> Self {
        val.0
    }
}

impl std::fmt::Display for ClockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A node together with the name it was inserted under
#[derive(Debug, Clone)]
struct NamedObject {
    name: Identifier,
    object: Object<NodeId>,
}

/// A netlist data structure
#[derive(Debug)]
pub struct Netlist {
    /// The identity stamped into every handle
    id: usize,
    /// The name of the netlist
    name: String,
    /// The list of nodes in the netlist
    objects: Vec<NamedObject>,
}

/// A clone is a separate netlist: it gets its own identity, and the handles
/// stored inside it are rewritten to match. Handles of the original are
/// foreign to the clone and vice versa; use [Netlist::find] to get at the
/// cloned nodes.
impl Clone for Netlist {
    fn clone(&self) -> Self {
        let id = NETLIST_IDS.fetch_add(1, Ordering::Relaxed);
        let mut objects = self.objects.clone();
        for named in objects.iter_mut() {
            if let Some(gate) = named.object.get_gate_mut() {
                gate.map_handles(|h| NodeId { netlist: id, ..h });
            }
        }
        Self {
            id,
            name: self.name.clone(),
            objects,
        }
    }
}

impl Netlist {
    /// Creates a new, empty netlist
    pub fn new(name: String) -> Self {
        Self {
            id: NETLIST_IDS.fetch_add(1, Ordering::Relaxed),
            name,
            objects: Vec::new(),
        }
    }

    /// Returns the name of the netlist
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Returns the number of nodes in the netlist
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if the netlist has no nodes
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn insert(&mut self, name: Identifier, object: Object<NodeId>) -> NodeId {
        let id = NodeId {
            netlist: self.id,
            index: self.objects.len(),
        };
        debug!("{}: inserting {} {name} as {id}", self.name, object.keyword());
        self.objects.push(NamedObject { name, object });
        id
    }

    /// Resolves a handle to an index, rejecting handles of other netlists
    fn index_of(&self, id: NodeId) -> Result<usize> {
        if id.netlist != self.id || id.index >= self.objects.len() {
            return Err(Error::ForeignHandle {
                id: id.to_string(),
                netlist: self.name.clone(),
            });
        }
        Ok(id.index)
    }

    fn gate_mut(&mut self, id: NodeId) -> Result<&mut Gate<NodeId>> {
        let index = self.index_of(id)?;
        gate_at(&mut self.objects, index).map(|(_, g)| g)
    }

    /// Inserts a constant source driving `value`
    pub fn insert_constant(&mut self, name: Identifier, value: bool) -> NodeId {
        self.insert(name, Object::Constant(value))
    }

    /// Inserts a constant source that always reads high
    pub fn insert_true(&mut self, name: Identifier) -> NodeId {
        self.insert_constant(name, true)
    }

    /// Inserts a constant source that always reads low
    pub fn insert_false(&mut self, name: Identifier) -> NodeId {
        self.insert_constant(name, false)
    }

    /// Inserts a gate with all of its inputs unbound and no clock.
    pub fn insert_gate(&mut self, kind: Combinator, name: Identifier) -> NodeId {
        self.insert(name, Object::Gate(Gate::new(kind)))
    }

    /// Inserts a gate and binds its inputs in one step.
    /// Errors if the number of inputs does not match the arity of `kind`.
    pub fn insert_gate_with(
        &mut self,
        kind: Combinator,
        name: Identifier,
        inputs: &[NodeId],
    ) -> Result<NodeId> {
        if inputs.len() != kind.arity() {
            return Err(Error::ArityMismatch {
                gate: name,
                expected: kind.arity(),
                found: inputs.len(),
            });
        }
        for input in inputs {
            self.index_of(*input)?;
        }
        let gate = self.insert_gate(kind, name);
        self.connect(gate, inputs)?;
        Ok(gate)
    }

    /// Inserts a clock that starts low. `interval` is only read by drivers.
    pub fn insert_clock(&mut self, name: Identifier, interval: Duration) -> ClockId {
        ClockId(self.insert(name, Object::Clock(Clock::new(interval))))
    }

    /// Rebinds every input of `gate`, overwriting the previous bindings.
    /// Loops are not rejected here; they surface during [Netlist::evaluate].
    pub fn connect(&mut self, gate: NodeId, inputs: &[NodeId]) -> Result<()> {
        for input in inputs {
            self.index_of(*input)?;
        }
        let index = self.index_of(gate)?;
        let (name, g) = gate_at(&mut self.objects, index)?;
        let expected = g.get_kind().arity();
        if inputs.len() != expected {
            return Err(Error::ArityMismatch {
                gate: name.clone(),
                expected,
                found: inputs.len(),
            });
        }
        g.set_inputs(inputs);
        debug!("{}: {name} <- {inputs:?}", self.name);
        Ok(())
    }

    /// Binds the single input of a unary gate
    pub fn set_input(&mut self, gate: NodeId, a: NodeId) -> Result<()> {
        self.connect(gate, &[a])
    }

    /// Binds both inputs of a binary gate as a pair
    pub fn set_inputs(&mut self, gate: NodeId, a: NodeId, b: NodeId) -> Result<()> {
        self.connect(gate, &[a, b])
    }

    /// Returns every input of `gate` to the unbound state.
    /// Returns the previous bindings, one entry per pin.
    pub fn disconnect(&mut self, gate: NodeId) -> Result<Vec<Option<NodeId>>> {
        let g = self.gate_mut(gate)?;
        let prev = g.get_inputs().to_vec();
        g.clear_inputs();
        Ok(prev)
    }

    /// Turns `gate` into a latch that only refreshes while `clock` is high.
    /// Replaces any clock that was bound before.
    pub fn set_clock(&mut self, gate: NodeId, clock: ClockId) -> Result<()> {
        let clock_index = self.index_of(clock.node())?;
        if self.objects[clock_index].object.get_clock().is_none() {
            return Err(Error::NotAClock {
                node: self.objects[clock_index].name.clone(),
            });
        }
        let index = self.index_of(gate)?;
        let (name, g) = gate_at(&mut self.objects, index)?;
        g.get_latch_mut().set_clock(Some(clock.node()));
        debug!("{}: {name} latched on {clock}", self.name);
        Ok(())
    }

    /// Removes the clock from `gate`, making it a pass-through again.
    /// Returns the clock that was bound, if any.
    pub fn clear_clock(&mut self, gate: NodeId) -> Result<Option<ClockId>> {
        let latch = self.gate_mut(gate)?.get_latch_mut();
        let prev = latch.get_clock().map(ClockId);
        latch.set_clock(None);
        Ok(prev)
    }

    /// Flips the level of `clock`
    pub fn advance(&mut self, clock: ClockId) -> Result<()> {
        let index = self.index_of(clock.node())?;
        let named = &mut self.objects[index];
        match &mut named.object {
            Object::Clock(c) => {
                c.advance();
                debug!("{}: {} is now {}", self.name, named.name, c.is_high());
                Ok(())
            }
            _ => Err(Error::NotAClock {
                node: named.name.clone(),
            }),
        }
    }

    /// Returns the time a driver should wait between advances of `clock`
    pub fn interval(&self, clock: ClockId) -> Result<Duration> {
        let index = self.index_of(clock.node())?;
        match &self.objects[index].object {
            Object::Clock(c) => Ok(c.get_interval()),
            _ => Err(Error::NotAClock {
                node: self.objects[index].name.clone(),
            }),
        }
    }

    /// Returns a handle to `id` as a clock, if it is one
    pub fn as_clock(&self, id: NodeId) -> Option<ClockId> {
        let index = self.index_of(id).ok()?;
        self.objects[index].object.get_clock().map(|_| ClockId(id))
    }

    /// Returns the node behind a handle
    pub fn get(&self, id: NodeId) -> Result<&Object<NodeId>> {
        let index = self.index_of(id)?;
        Ok(&self.objects[index].object)
    }

    /// Returns the name a node was inserted under
    pub fn get_identifier(&self, id: NodeId) -> Result<&Identifier> {
        let index = self.index_of(id)?;
        Ok(&self.objects[index].name)
    }

    /// Finds the first node with the given name
    pub fn find(&self, name: &Identifier) -> Option<NodeId> {
        self.objects().find(|(_, n, _)| *n == name).map(|(id, _, _)| id)
    }

    /// Returns the value a latch is holding, without recomputing anything.
    /// Returns `None` for nodes that are not gates.
    pub fn peek(&self, id: NodeId) -> Option<bool> {
        let index = self.index_of(id).ok()?;
        self.objects[index]
            .object
            .get_gate()
            .map(|g| g.get_latch().last())
    }

    /// Evaluates the output of a node, pulling its inputs on demand.
    ///
    /// Latched gates whose clock is high record the value they compute,
    /// which is why this takes `&mut self`. Errors if the node is reached
    /// again while it is still being evaluated.
    pub fn evaluate(&mut self, id: impl Into<NodeId>) -> Result<bool> {
        let index = self.index_of(id.into())?;
        let mut visiting = HashSet::new();
        self.evaluate_at(index, &mut visiting)
    }

    fn evaluate_at(&mut self, index: usize, visiting: &mut HashSet<usize>) -> Result<bool> {
        if !visiting.insert(index) {
            let node = self.objects[index].name.clone();
            warn!("{}: combinational loop through {node}", self.name);
            return Err(Error::CombinationalLoop { node });
        }

        let value = match &self.objects[index].object {
            Object::Constant(v) => *v,
            Object::Clock(c) => c.is_high(),
            Object::Gate(gate) => {
                let kind = gate.get_kind();
                let inputs = gate.get_inputs().to_vec();
                let clock_high = match gate.get_latch().get_clock() {
                    Some(c) => Some(self.is_high(c)?),
                    None => None,
                };
                let held = gate.get_latch().held(clock_high);
                match held {
                    Some(held) => {
                        trace!("{}: {} holds {held}", self.name, self.objects[index].name);
                        held
                    }
                    None => {
                        let mut operands = [kind.neutral_default(); 2];
                        for (slot, input) in operands.iter_mut().zip(inputs) {
                            if let Some(input) = input {
                                *slot = self.evaluate_at(input.index, visiting)?;
                            }
                        }
                        let fresh = kind.apply(operands[0], operands[1]);
                        let (name, g) = gate_at(&mut self.objects, index)?;
                        g.get_latch_mut().record(clock_high, fresh);
                        if clock_high.is_some() {
                            trace!("{}: {name} latches {fresh}", self.name);
                        }
                        fresh
                    }
                }
            }
        };

        visiting.remove(&index);
        Ok(value)
    }

    fn is_high(&self, clock: NodeId) -> Result<bool> {
        let named = &self.objects[clock.index];
        match &named.object {
            Object::Clock(c) => Ok(c.is_high()),
            _ => Err(Error::NotAClock {
                node: named.name.clone(),
            }),
        }
    }

    /// Builds an analysis of the current state of the netlist
    pub fn get_analysis<'a, A: Analysis<'a>>(&'a self) -> Result<A> {
        A::build(self)
    }
}

/// Splits a node into its name and its gate, erroring if it is not a gate
fn gate_at(
    objects: &mut [NamedObject],
    index: usize,
) -> Result<(&Identifier, &mut Gate<NodeId>)> {
    let NamedObject { name, object } = &mut objects[index];
    match object.get_gate_mut() {
        Some(g) => Ok((&*name, g)),
        None => Err(Error::NotAGate { node: name.clone() }),
    }
}

/// Which pin of a gate a connection lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pin {
    /// A data input, by position
    Input(usize),
    /// The clock gating a latch
    Clock,
}

impl std::fmt::Display for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pin::Input(i) => write!(f, "in{i}"),
            Pin::Clock => write!(f, "clk"),
        }
    }
}

/// A wire from the node being read to the gate reading it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    src: NodeId,
    target: NodeId,
    pin: Pin,
}

impl Connection {
    /// The node being read
    pub fn src(&self) -> NodeId {
        self.src
    }

    /// The gate reading it
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// The pin the wire lands on
    pub fn pin(&self) -> Pin {
        self.pin
    }
}

impl std::fmt::Display for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}.{}", self.src, self.target, self.pin)
    }
}

/// A collection of iterators for the netlist
pub mod iter {

    use super::{Connection, Identifier, NodeId, Netlist, Object, Pin};

    /// An iterator over the nodes in a netlist
    pub struct ObjectIterator<'a> {
        netlist: &'a Netlist,
        index: usize,
    }

    impl<'a> ObjectIterator<'a> {
        /// Creates a new object iterator for the netlist
        pub fn new(netlist: &'a Netlist) -> Self {
            Self { netlist, index: 0 }
        }
    }

    impl<'a> Iterator for ObjectIterator<'a> {
        type Item = (NodeId, &'a Identifier, &'a Object<NodeId>);

        fn next(&mut self) -> Option<Self::Item> {
            let named = self.netlist.objects.get(self.index)?;
            let id = NodeId {
                netlist: self.netlist.id,
                index: self.index,
            };
            self.index += 1;
            Some((id, &named.name, &named.object))
        }
    }

    /// An iterator over the connections in a netlist
    pub struct ConnectionIterator<'a> {
        netlist: &'a Netlist,
        index: usize,
        subindex: usize,
    }

    impl<'a> ConnectionIterator<'a> {
        /// Create a new connection iterator for the netlist
        pub fn new(netlist: &'a Netlist) -> Self {
            Self {
                netlist,
                index: 0,
                subindex: 0,
            }
        }
    }

    impl Iterator for ConnectionIterator<'_> {
        type Item = Connection;

        fn next(&mut self) -> Option<Self::Item> {
            while let Some(named) = self.netlist.objects.get(self.index) {
                let target = NodeId {
                    netlist: self.netlist.id,
                    index: self.index,
                };
                if let Object::Gate(gate) = &named.object {
                    let inputs = gate.get_inputs();
                    // Data pins first, then the clock
                    while self.subindex <= inputs.len() {
                        let pos = self.subindex;
                        self.subindex += 1;
                        let (src, pin) = match inputs.get(pos) {
                            Some(src) => (*src, Pin::Input(pos)),
                            None => (gate.get_latch().get_clock(), Pin::Clock),
                        };
                        if let Some(src) = src {
                            return Some(Connection { src, target, pin });
                        }
                    }
                }
                self.subindex = 0;
                self.index += 1;
            }
            None
        }
    }
}

/// Filter the nodes of a netlist by their [Object]. Use it like you would `matches!`.
/// Example: ```filter_nodes!(netlist, Object::Clock(_));```
#[macro_export]
macro_rules! filter_nodes {
    ($netlist:ident, $pattern:pat $(if $guard:expr)? $(,)?) => {
        $netlist.matches(|f| match f {
            $pattern $(if $guard)? => true,
            _ => false
        })
    };
}

impl Netlist {
    /// Returns an iterator over the nodes in the netlist.
    pub fn objects(&self) -> impl Iterator<Item = (NodeId, &Identifier, &Object<NodeId>)> {
        iter::ObjectIterator::new(self)
    }

    /// Returns an iterator over the handles of nodes matching `filter`.
    pub fn matches<F>(&self, filter: F) -> impl Iterator<Item = NodeId>
    where
        F: Fn(&Object<NodeId>) -> bool,
    {
        self.objects()
            .filter(move |(_, _, o)| filter(o))
            .map(|(id, _, _)| id)
    }

    /// Returns an iterator over the gates in the netlist.
    pub fn gates(&self) -> impl Iterator<Item = NodeId> {
        self.matches(|o| matches!(o, Object::Gate(_)))
    }

    /// Returns an iterator over the clocks in the netlist.
    pub fn clocks(&self) -> impl Iterator<Item = ClockId> {
        self.matches(|o| matches!(o, Object::Clock(_)))
            .map(ClockId)
    }

    /// Returns an iterator over the wire connections in the netlist.
    pub fn connections(&self) -> impl Iterator<Item = Connection> {
        iter::ConnectionIterator::new(self)
    }

    fn name_at(&self, id: Option<NodeId>) -> String {
        match id {
            Some(id) => self.objects[id.index].name.to_string(),
            None => "?".to_string(),
        }
    }
}

impl std::fmt::Display for Netlist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "netlist {} {{", self.name)?;

        let indent = " ".repeat(2);
        for named in self.objects.iter() {
            let name = &named.name;
            let param = named.object.parameter();
            match &named.object {
                Object::Constant(_) => writeln!(f, "{indent}const {name} = {param};")?,
                Object::Clock(_) => writeln!(f, "{indent}clock {name} #({param});")?,
                Object::Gate(gate) => {
                    let pins = gate
                        .get_inputs()
                        .iter()
                        .map(|i| self.name_at(*i))
                        .collect::<Vec<_>>()
                        .join(", ");
                    write!(f, "{indent}{} {name} ({pins})", gate.get_kind())?;
                    if let Some(clock) = gate.get_latch().get_clock() {
                        write!(f, " @({})", self.name_at(Some(clock)))?;
                    }
                    writeln!(f, "; // {param}")?;
                }
            }
        }

        writeln!(f, "}}")
    }
}
