#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs, unreachable_pub)]
/*!

`latchnet`

A small network of boolean nodes: constant sources, NOT/AND/OR/NAND/XOR/NOR/XNOR
gates, and clocks. Any gate can be latched on a clock, after which it only
refreshes its output while the clock reads high.

## Simple Example
```
use latchnet::circuit::Combinator;
use latchnet::netlist::Netlist;
use std::time::Duration;

let mut netlist = Netlist::new("example".to_string());
let t = netlist.insert_true("t".into());
let f = netlist.insert_false("f".into());
let clk = netlist.insert_clock("clk".into(), Duration::from_millis(500));

let and = netlist.insert_gate(Combinator::And, "and".into());
netlist.set_inputs(and, t, f).unwrap();
netlist.set_clock(and, clk).unwrap();

// The clock starts low, so the latch still holds its initial value
assert!(!netlist.evaluate(and).unwrap());

netlist.advance(clk).unwrap();
netlist.set_inputs(and, t, t).unwrap();
assert!(netlist.evaluate(and).unwrap());
```

*/

pub mod circuit;
pub mod error;
pub mod graph;
pub mod netlist;
pub mod parameter;
pub mod sim;
pub mod util;

pub use error::{Error, Result};
