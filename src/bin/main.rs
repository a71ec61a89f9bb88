use clap::{Parser, ValueEnum};
use latchnet::circuit::Combinator;
use latchnet::netlist::Netlist;
use latchnet::sim::{SimConfig, Simulator, ThreadSleeper, truth_table_block};
use std::time::Duration;

/// Clock interval when neither the command line nor the config sets one
const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Demo {
    /// Rebind gates by hand and print their truth tables
    Clockless,
    /// Latch an AND gate on a clock and sample it every tick
    Clocked,
    /// Run both demos
    Both,
}

#[derive(Parser)]
#[command(name = "latchnet", version, about = "Logic gates, latches and a clock")]
struct Cli {
    /// Which demo to run
    #[arg(long, value_enum, default_value = "both")]
    demo: Demo,
    /// Number of clock advances in the clocked demo
    #[arg(long)]
    ticks: Option<usize>,
    /// Milliseconds to wait between clock advances [default: 500].
    /// Takes precedence over `interval_ms` in the config file.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: Option<u64>,
    /// Read simulator settings from a JSON file
    #[cfg(feature = "serde")]
    #[arg(long)]
    config: Option<std::path::PathBuf>,
    /// Print the netlist of each demo before running it
    #[arg(long)]
    show_netlist: bool,
}

impl Cli {
    fn sim_config(&self) -> Result<SimConfig, Box<dyn std::error::Error>> {
        #[cfg(feature = "serde")]
        let mut config = match &self.config {
            Some(path) => SimConfig::from_json_reader(std::fs::File::open(path)?)?,
            None => SimConfig::default(),
        };
        #[cfg(not(feature = "serde"))]
        let mut config = SimConfig::default();

        if let Some(ticks) = self.ticks {
            config.ticks = ticks;
        }
        if let Some(ms) = self.interval_ms {
            config.interval = Some(Duration::from_millis(ms));
        }
        config.validate()?;
        Ok(config)
    }
}

fn clockless(show_netlist: bool) -> latchnet::Result<()> {
    let mut netlist = Netlist::new("clockless".to_string());

    let f = netlist.insert_false("F".into());
    let t = netlist.insert_true("T".into());

    let and_gate = netlist.insert_gate(Combinator::And, "and_gate".into());
    let or_gate = netlist.insert_gate(Combinator::Or, "or_gate".into());
    let not_gate = netlist.insert_gate(Combinator::Not, "not_gate".into());
    let nand_gate = netlist.insert_gate(Combinator::Nand, "nand_gate".into());

    let pairs: [&[_]; 4] = [&[f, f], &[f, t], &[t, f], &[t, t]];
    println!("{}", truth_table_block(&mut netlist, &"AND".into(), and_gate, &pairs)?);
    println!("{}", truth_table_block(&mut netlist, &"OR".into(), or_gate, &pairs)?);
    let singles: [&[_]; 2] = [&[f], &[t]];
    println!("{}", truth_table_block(&mut netlist, &"NOT".into(), not_gate, &singles)?);

    // NAND reads the other gates, which are left bound to (T, T)
    let nested: [&[_]; 2] = [&[or_gate, and_gate], &[or_gate, f]];
    println!("{}", truth_table_block(&mut netlist, &"NAND".into(), nand_gate, &nested)?);

    if show_netlist {
        println!("{netlist}");
    }
    Ok(())
}

fn clocked(config: SimConfig, interval: Duration, show_netlist: bool) -> latchnet::Result<()> {
    let mut netlist = Netlist::new("clocked".to_string());

    let f = netlist.insert_false("F".into());
    let t = netlist.insert_true("T".into());
    let clk = netlist.insert_clock("clk".into(), interval);

    let and_gate = netlist.insert_gate_with(Combinator::And, "and_gate".into(), &[t, f])?;
    netlist.set_clock(and_gate, clk)?;

    if show_netlist {
        println!("{netlist}");
    }

    let mut sim = Simulator::new(config)?;
    sim.watch("clk", clk).watch("and", and_gate);
    let trace = sim.run(&mut netlist, clk, &mut ThreadSleeper)?;
    print!("{trace}");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.sim_config()?;
    let interval = config.interval.unwrap_or(DEFAULT_INTERVAL);

    if matches!(cli.demo, Demo::Clockless | Demo::Both) {
        clockless(cli.show_netlist)?;
    }
    if matches!(cli.demo, Demo::Clocked | Demo::Both) {
        clocked(config, interval, cli.show_netlist)?;
    }
    Ok(())
}
