/*!

  Analyses over the wiring of a netlist.

*/

use crate::error::Result;
#[cfg(feature = "graph")]
use crate::netlist::Pin;
use crate::netlist::{NodeId, Netlist};
#[cfg(feature = "graph")]
use petgraph::graph::DiGraph;
use std::collections::HashMap;

/// A common trait of analyses than can be performed on a netlist.
/// An analysis becomes stale when the netlist is rewired.
pub trait Analysis<'a>
where
    Self: Sized + 'a,
{
    /// Construct the analysis to the current state of the netlist.
    fn build(netlist: &'a Netlist) -> Result<Self>;
}

/// A table that maps nodes to the gates that read them
pub struct FanOutTable<'a> {
    // A reference to the underlying netlist
    _netlist: &'a Netlist,
    // Maps a node to the list of gates it drives, data pins and clock pins alike
    node_fan_out: HashMap<NodeId, Vec<NodeId>>,
}

impl FanOutTable<'_> {
    /// Returns an iterator to the gates that read `node`.
    pub fn get_users(&self, node: &NodeId) -> impl Iterator<Item = NodeId> {
        self.node_fan_out
            .get(node)
            .into_iter()
            .flat_map(|users| users.iter().cloned())
    }

    /// Returns `true` if any gate reads `node`
    pub fn has_users(&self, node: &NodeId) -> bool {
        self.node_fan_out
            .get(node)
            .is_some_and(|users| !users.is_empty())
    }
}

impl<'a> Analysis<'a> for FanOutTable<'a> {
    fn build(netlist: &'a Netlist) -> Result<Self> {
        let mut node_fan_out: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for c in netlist.connections() {
            let users = node_fan_out.entry(c.src()).or_default();
            // A gate reading the same node on both pins is one user
            if !users.contains(&c.target()) {
                users.push(c.target());
            }
        }

        Ok(FanOutTable {
            _netlist: netlist,
            node_fan_out,
        })
    }
}

/// Returns a petgraph representation of the netlist as a directed multi-graph.
/// Nodes are labelled by name, edges by the pin they land on.
#[cfg(feature = "graph")]
pub struct MultiDiGraph<'a> {
    _netlist: &'a Netlist,
    graph: DiGraph<String, Pin>,
}

#[cfg(feature = "graph")]
impl MultiDiGraph<'_> {
    /// Return a reference to the graph constructed by this analysis
    pub fn get_graph(&self) -> &DiGraph<String, Pin> {
        &self.graph
    }
}

#[cfg(feature = "graph")]
impl<'a> Analysis<'a> for MultiDiGraph<'a> {
    fn build(netlist: &'a Netlist) -> Result<Self> {
        let mut mapping = HashMap::new();
        let mut graph = DiGraph::new();

        for (id, name, _) in netlist.objects() {
            let index = graph.add_node(name.to_string());
            mapping.insert(id, index);
        }

        for connection in netlist.connections() {
            let s_id = mapping[&connection.src()];
            let t_id = mapping[&connection.target()];
            graph.add_edge(s_id, t_id, connection.pin());
        }

        Ok(Self {
            _netlist: netlist,
            graph,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Combinator;
    use std::time::Duration;

    fn half_adder() -> (Netlist, [NodeId; 4]) {
        let mut netlist = Netlist::new("half_adder".to_string());
        let a = netlist.insert_true("a".into());
        let b = netlist.insert_false("b".into());
        let sum = netlist
            .insert_gate_with(Combinator::Xor, "sum".into(), &[a, b])
            .unwrap();
        let carry = netlist
            .insert_gate_with(Combinator::And, "carry".into(), &[a, b])
            .unwrap();
        (netlist, [a, b, sum, carry])
    }

    #[test]
    fn fanout_table() {
        let (netlist, [a, b, sum, carry]) = half_adder();
        let analysis = netlist.get_analysis::<FanOutTable>();
        assert!(analysis.is_ok());
        let analysis = analysis.unwrap();

        for input in [a, b] {
            let users: Vec<_> = analysis.get_users(&input).collect();
            assert_eq!(users, vec![sum, carry]);
        }
        for output in [sum, carry] {
            assert!(!analysis.has_users(&output), "Outputs should not have users");
        }
    }

    #[test]
    fn clocks_fan_out_to_latches() {
        let (mut netlist, [a, _, sum, carry]) = half_adder();
        let clk = netlist.insert_clock("clk".into(), Duration::from_millis(1));
        netlist.set_clock(carry, clk).unwrap();
        let not = netlist
            .insert_gate_with(Combinator::Not, "not".into(), &[a])
            .unwrap();
        netlist.set_inputs(sum, not, not).unwrap();

        let analysis = FanOutTable::build(&netlist).unwrap();
        assert_eq!(analysis.get_users(&clk.node()).collect::<Vec<_>>(), vec![carry]);
        // Both pins of `sum` read `not`
        assert_eq!(analysis.get_users(&not).collect::<Vec<_>>(), vec![sum]);
        assert_eq!(analysis.get_users(&a).collect::<Vec<_>>(), vec![carry, not]);
    }

    #[cfg(feature = "graph")]
    #[test]
    fn multi_di_graph() {
        let (netlist, _) = half_adder();
        let analysis = netlist.get_analysis::<MultiDiGraph>().unwrap();
        let graph = analysis.get_graph();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        assert!(graph.edge_weights().all(|p| matches!(p, Pin::Input(_))));
    }
}
