use latchnet::Error;
use latchnet::circuit::Combinator;
use latchnet::graph::FanOutTable;
use latchnet::netlist::{Netlist, Pin};
use std::time::Duration;

fn get_simple_example() -> Netlist {
    let mut netlist = Netlist::new("example".to_string());

    let a = netlist.insert_true("a".into());
    let b = netlist.insert_false("b".into());

    netlist
        .insert_gate_with(Combinator::And, "inst_0".into(), &[a, b])
        .unwrap();

    netlist
}

#[test]
fn test_detect_cycles() {
    let mut netlist = get_simple_example();
    let inst_0 = netlist.find(&"inst_0".into()).unwrap();

    // No cycles yet.
    assert!(netlist.evaluate(inst_0).is_ok());

    let a = netlist.find(&"a".into()).unwrap();
    let inverter = netlist
        .insert_gate_with(Combinator::Not, "inv".into(), &[a])
        .unwrap();
    netlist.set_inputs(inst_0, inverter, a).unwrap();
    netlist.set_input(inverter, inst_0).unwrap();

    // Now there is a cycle.
    assert_eq!(
        netlist.evaluate(inst_0),
        Err(Error::CombinationalLoop {
            node: "inst_0".into()
        })
    );

    // Breaking it restores evaluation
    netlist.set_input(inverter, a).unwrap();
    assert!(!netlist.evaluate(inst_0).unwrap());
}

#[test]
fn test_fan_out() {
    let mut netlist = get_simple_example();
    let inst_0 = netlist.find(&"inst_0".into()).unwrap();
    let clk = netlist.insert_clock("clk".into(), Duration::from_millis(1));
    netlist.set_clock(inst_0, clk).unwrap();

    let fo = netlist.get_analysis::<FanOutTable>().unwrap();
    for (id, _, _) in netlist.objects() {
        if id == inst_0 {
            assert!(!fo.has_users(&id));
        } else {
            assert_eq!(fo.get_users(&id).collect::<Vec<_>>(), vec![inst_0]);
        }
    }

    let clock_pins = netlist
        .connections()
        .filter(|c| c.pin() == Pin::Clock)
        .count();
    assert_eq!(clock_pins, 1);
}
