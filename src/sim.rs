/*!

  A driver that paces a clock and samples gates.

  The netlist itself has no notion of time: [crate::netlist::Netlist::advance]
  flips a clock immediately. The [Simulator] waits out the clock's interval
  through a [Sleeper], advances it, then evaluates every watched node.

*/

use crate::{
    circuit::Identifier,
    error::{Error, Result},
    netlist::{ClockId, Netlist, NodeId},
};
use log::info;
use std::time::Duration;

/// Something that can wait out a clock interval
pub trait Sleeper {
    /// Blocks for `duration`
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Returns immediately, for tests and batch runs
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&mut self, _duration: Duration) {}
}

/// Settings for a [Simulator] run
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// The number of clock advances to perform
    pub ticks: usize,
    /// Overrides the clock's own interval
    #[cfg_attr(feature = "serde", serde(rename = "interval_ms", with = "millis"))]
    pub interval: Option<Duration>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ticks: 10,
            interval: None,
        }
    }
}

impl SimConfig {
    /// Checks that the settings describe a run that can happen
    pub fn validate(&self) -> Result<()> {
        if self.ticks == 0 {
            return Err(Error::Config("ticks must be at least 1".to_string()));
        }
        if self.interval.is_some_and(|d| d.is_zero()) {
            return Err(Error::Config("interval must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Reads settings from JSON, filling in defaults for missing fields
    #[cfg(feature = "serde")]
    pub fn from_json_reader(reader: impl std::io::Read) -> Result<Self> {
        let config: Self =
            serde_json::from_reader(reader).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(feature = "serde")]
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

/// The values observed right after one clock advance
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct Sample {
    /// 1-based index of the advance
    pub tick: usize,
    /// The clock level after the advance
    pub clock: bool,
    /// One value per watched node, in watch order
    pub values: Vec<bool>,
}

/// Every sample of a run, along with the labels of the watched nodes
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct Trace {
    labels: Vec<String>,
    samples: Vec<Sample>,
}

impl Trace {
    /// Returns the samples in tick order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Returns the values of the watched node labelled `label`, in tick order
    pub fn column(&self, label: &str) -> Option<Vec<bool>> {
        let pos = self.labels.iter().position(|l| l == label)?;
        Some(self.samples.iter().map(|s| s.values[pos]).collect())
    }
}

impl std::fmt::Display for Trace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for sample in &self.samples {
            let line = self
                .labels
                .iter()
                .zip(&sample.values)
                .map(|(l, v)| format!("{l}={}", u8::from(*v)))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Paces a clock and samples the watched nodes after every advance
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimConfig,
    watched: Vec<(String, NodeId)>,
}

impl Simulator {
    /// Creates a simulator, rejecting unusable settings
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            watched: Vec::new(),
        })
    }

    /// Samples `node` after every advance, printed as `label`
    pub fn watch(&mut self, label: impl Into<String>, node: impl Into<NodeId>) -> &mut Self {
        self.watched.push((label.into(), node.into()));
        self
    }

    /// Runs the configured number of ticks against `clock`
    pub fn run(
        &self,
        netlist: &mut Netlist,
        clock: ClockId,
        sleeper: &mut impl Sleeper,
    ) -> Result<Trace> {
        let interval = match self.config.interval {
            Some(d) => d,
            None => netlist.interval(clock)?,
        };
        info!(
            "{}: running {} ticks every {}ms",
            netlist.get_name(),
            self.config.ticks,
            interval.as_millis()
        );

        let mut samples = Vec::with_capacity(self.config.ticks);
        for tick in 1..=self.config.ticks {
            sleeper.sleep(interval);
            netlist.advance(clock)?;
            let values = self
                .watched
                .iter()
                .map(|(_, node)| netlist.evaluate(*node))
                .collect::<Result<Vec<_>>>()?;
            samples.push(Sample {
                tick,
                clock: netlist.evaluate(clock)?,
                values,
            });
        }

        Ok(Trace {
            labels: self.watched.iter().map(|(l, _)| l.clone()).collect(),
            samples,
        })
    }
}

/// Rebinds `gate` to each input combination in turn and renders the results
/// as a labelled block, one value per line.
pub fn truth_table_block(
    netlist: &mut Netlist,
    label: &Identifier,
    gate: NodeId,
    rows: &[&[NodeId]],
) -> Result<String> {
    let mut block = format!("{label}:\n");
    for inputs in rows {
        netlist.connect(gate, inputs)?;
        let value = netlist.evaluate(gate)?;
        block.push_str(&format!("{}\n", u8::from(value)));
    }
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_listing_eq;
    use crate::circuit::Combinator;

    /// Records every requested sleep
    #[derive(Default)]
    struct Recorder(Vec<Duration>);

    impl Sleeper for Recorder {
        fn sleep(&mut self, duration: Duration) {
            self.0.push(duration);
        }
    }

    #[test]
    fn config_validation() {
        assert!(SimConfig::default().validate().is_ok());
        let zero_ticks = SimConfig {
            ticks: 0,
            interval: None,
        };
        assert!(matches!(zero_ticks.validate(), Err(Error::Config(_))));
        let zero_interval = SimConfig {
            ticks: 1,
            interval: Some(Duration::ZERO),
        };
        assert!(Simulator::new(zero_interval).is_err());
    }

    #[test]
    fn sleeps_once_per_tick() {
        let mut netlist = Netlist::new("pacing".to_string());
        let clk = netlist.insert_clock("clk".into(), Duration::from_millis(20));
        let sim = Simulator::new(SimConfig {
            ticks: 3,
            interval: None,
        })
        .unwrap();
        let mut recorder = Recorder::default();
        let trace = sim.run(&mut netlist, clk, &mut recorder).unwrap();
        assert_eq!(recorder.0, vec![Duration::from_millis(20); 3]);
        let clocks: Vec<_> = trace.samples().iter().map(|s| s.clock).collect();
        assert_eq!(clocks, vec![true, false, true]);
    }

    #[test]
    fn interval_override() {
        let mut netlist = Netlist::new("override".to_string());
        let clk = netlist.insert_clock("clk".into(), Duration::from_secs(1));
        let sim = Simulator::new(SimConfig {
            ticks: 2,
            interval: Some(Duration::from_millis(3)),
        })
        .unwrap();
        let mut recorder = Recorder::default();
        sim.run(&mut netlist, clk, &mut recorder).unwrap();
        assert_eq!(recorder.0, vec![Duration::from_millis(3); 2]);
    }

    #[test]
    fn trace_rendering() {
        let mut netlist = Netlist::new("render".to_string());
        let t = netlist.insert_true("t".into());
        let clk = netlist.insert_clock("clk".into(), Duration::from_millis(1));
        let buf = netlist
            .insert_gate_with(Combinator::And, "buf".into(), &[t, t])
            .unwrap();
        netlist.set_clock(buf, clk).unwrap();

        let mut sim = Simulator::new(SimConfig {
            ticks: 3,
            interval: None,
        })
        .unwrap();
        sim.watch("clk", clk).watch("buf", buf);
        let trace = sim.run(&mut netlist, clk, &mut NoSleep).unwrap();
        assert_eq!(trace.column("buf"), Some(vec![true, true, true]));
        assert_eq!(trace.column("nope"), None);
        assert_listing_eq!(
            trace.to_string(),
            "clk=1 buf=1
             clk=0 buf=1
             clk=1 buf=1\n"
        );
    }

    #[test]
    fn truth_table_blocks() {
        let mut netlist = Netlist::new("blocks".to_string());
        let f = netlist.insert_false("F".into());
        let t = netlist.insert_true("T".into());
        let or = netlist.insert_gate(Combinator::Or, "or".into());
        let rows: [&[NodeId]; 4] = [&[f, f], &[f, t], &[t, f], &[t, t]];
        let block = truth_table_block(&mut netlist, &"OR".into(), or, &rows).unwrap();
        assert_eq!(block, "OR:\n0\n1\n1\n1\n");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_from_json() {
        let config = SimConfig::from_json_reader(r#"{"ticks": 4, "interval_ms": 25}"#.as_bytes())
            .unwrap();
        assert_eq!(config.ticks, 4);
        assert_eq!(config.interval, Some(Duration::from_millis(25)));

        let defaults = SimConfig::from_json_reader("{}".as_bytes()).unwrap();
        assert_eq!(defaults, SimConfig::default());

        assert!(SimConfig::from_json_reader(r#"{"ticks": 0}"#.as_bytes()).is_err());
    }
}
