use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer};

/// Errors surfaced while loading or validating a trace file.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to read trace file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse trace: {0}")]
    Json(#[from] serde_json::Error),
    #[error("trace contains no activities")]
    EmptyTrace,
    #[error("activity {index} references node {node}, but the trace has {nodes} nodes")]
    NodeOutOfRange {
        index: usize,
        node: usize,
        nodes: usize,
    },
    #[error(
        "activity {index} references modulation {modulation}, but the trace has {modulations} modulations"
    )]
    ModulationOutOfRange {
        index: usize,
        modulation: usize,
        modulations: usize,
    },
    #[error("activity {index} ends at {end} before it starts at {start}")]
    InvertedInterval { index: usize, start: f64, end: f64 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    pub id: u64,
    #[serde(default)]
    pub role: String,
}

/// Physical-layer configuration with the display color assigned by the
/// trace producer. RGBA components are in `[0, 1]`.
#[derive(Debug, Clone, Deserialize)]
pub struct Modulation {
    pub name: String,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, Deserialize)]
pub struct Network {
    pub nodes: Vec<Node>,
    pub modulations: Vec<Modulation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotKind {
    Sync,
    SlotSchedule,
    RoundSchedule,
    Contention,
    Data,
    Ack,
    Empty,
}

impl SlotKind {
    fn as_str(self) -> &'static str {
        match self {
            SlotKind::Sync => "SYNC",
            SlotKind::SlotSchedule => "SLOT_SCHEDULE",
            SlotKind::RoundSchedule => "ROUND_SCHEDULE",
            SlotKind::Contention => "CONTENTION",
            SlotKind::Data => "DATA",
            SlotKind::Ack => "ACK",
            SlotKind::Empty => "EMPTY",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of activity kinds. Tags the producer invents later decode
/// to `Unknown` and are skipped when drawing instead of failing the load.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityKind {
    Round {
        round_type: String,
        modulation: usize,
    },
    Slot {
        slot_type: SlotKind,
    },
    Cad {
        success: bool,
    },
    Rx,
    Tx,
    Unknown,
}

/// One timestamped interval event on a single node.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub start: f64,
    pub end: f64,
    pub node: usize,
    pub energy: Option<f64>,
    pub kind: ActivityKind,
}

impl Activity {
    /// Short on-screen description, `None` for kinds this viewer does
    /// not know how to draw.
    pub fn descriptor(&self) -> Option<String> {
        match &self.kind {
            ActivityKind::Round { round_type, .. } => Some(round_type.clone()),
            ActivityKind::Slot { slot_type } => Some(slot_type.to_string()),
            ActivityKind::Cad { success } => Some(format!("CAD ({success})")),
            ActivityKind::Rx => Some("Rx".to_owned()),
            ActivityKind::Tx => Some("Tx".to_owned()),
            ActivityKind::Unknown => None,
        }
    }
}

#[derive(Deserialize)]
struct RawActivity {
    activity_type: String,
    start: f64,
    end: f64,
    node: usize,
    #[serde(default)]
    energy: Option<f64>,
    #[serde(default)]
    details: serde_json::Value,
}

#[derive(Deserialize)]
struct RoundDetails {
    round_type: String,
    modulation: usize,
}

#[derive(Deserialize)]
struct SlotDetails {
    slot_type: SlotKind,
}

#[derive(Deserialize)]
struct CadDetails {
    success: bool,
}

impl<'de> Deserialize<'de> for Activity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error as _;

        let raw = RawActivity::deserialize(deserializer)?;

        let kind = match raw.activity_type.as_str() {
            "LWBRoundActivity" => {
                let details: RoundDetails =
                    serde_json::from_value(raw.details).map_err(D::Error::custom)?;
                ActivityKind::Round {
                    round_type: details.round_type,
                    modulation: details.modulation,
                }
            }
            "LWBSlotActivity" => {
                let details: SlotDetails =
                    serde_json::from_value(raw.details).map_err(D::Error::custom)?;
                ActivityKind::Slot {
                    slot_type: details.slot_type,
                }
            }
            "CADActivity" => {
                let details: CadDetails =
                    serde_json::from_value(raw.details).map_err(D::Error::custom)?;
                ActivityKind::Cad {
                    success: details.success,
                }
            }
            "RxActivity" => ActivityKind::Rx,
            "TxActivity" => ActivityKind::Tx,
            _ => ActivityKind::Unknown,
        };

        Ok(Activity {
            start: raw.start,
            end: raw.end,
            node: raw.node,
            energy: raw.energy,
            kind,
        })
    }
}

#[derive(Deserialize)]
struct RawTrace {
    network: Network,
    activities: Vec<Activity>,
}

/// A complete recorded session: node list, modulation table, and the
/// activity sequence. Immutable after construction; the two index
/// vectors keep the activities ordered by `start` and by `end` for the
/// draw and visibility passes respectively.
#[derive(Debug, Clone)]
pub struct Trace {
    network: Network,
    activities: Vec<Activity>,
    by_start: Vec<usize>,
    by_end: Vec<usize>,
}

impl Trace {
    pub fn new(network: Network, activities: Vec<Activity>) -> Result<Self, Error> {
        if activities.is_empty() {
            return Err(Error::EmptyTrace);
        }

        for (index, activity) in activities.iter().enumerate() {
            if activity.node >= network.nodes.len() {
                return Err(Error::NodeOutOfRange {
                    index,
                    node: activity.node,
                    nodes: network.nodes.len(),
                });
            }
            if activity.end < activity.start {
                return Err(Error::InvertedInterval {
                    index,
                    start: activity.start,
                    end: activity.end,
                });
            }
            if let ActivityKind::Round { modulation, .. } = &activity.kind
                && *modulation >= network.modulations.len()
            {
                return Err(Error::ModulationOutOfRange {
                    index,
                    modulation: *modulation,
                    modulations: network.modulations.len(),
                });
            }
        }

        let mut by_start: Vec<usize> = (0..activities.len()).collect();
        by_start.sort_unstable_by(|&a, &b| activities[a].start.total_cmp(&activities[b].start));

        let mut by_end: Vec<usize> = (0..activities.len()).collect();
        by_end.sort_unstable_by(|&a, &b| activities[a].end.total_cmp(&activities[b].end));

        Ok(Self {
            network,
            activities,
            by_start,
            by_end,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let raw: RawTrace = serde_json::from_str(json)?;
        Self::new(raw.network, raw.activities)
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn node_count(&self) -> usize {
        self.network.nodes.len()
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// Activities in file order, as loaded.
    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    /// Activities in ascending `start` order, for full draw passes
    /// where chronological stacking matters.
    pub fn by_start(&self) -> impl Iterator<Item = &Activity> + '_ {
        self.by_start.iter().map(move |&i| &self.activities[i])
    }

    /// Activities in ascending `end` order.
    pub fn by_end(&self) -> impl Iterator<Item = &Activity> + '_ {
        self.by_end.iter().map(move |&i| &self.activities[i])
    }

    /// Earliest start and latest end over the whole trace.
    pub fn extent(&self) -> (f64, f64) {
        let first = &self.activities[self.by_start[0]];
        let last = &self.activities[self.by_end[self.by_end.len() - 1]];
        (first.start, last.end)
    }

    /// Rank in the by-end order of the first activity whose interval
    /// could still be visible at `position`: the smallest rank with
    /// `end > position`, clamped to the last rank once every activity
    /// has ended. Iterative binary search, O(log n).
    pub fn first_visible(&self, position: f64) -> usize {
        let mut lo = 0;
        let mut hi = self.by_end.len();

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.activities[self.by_end[mid]].end > position {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }

        lo.min(self.by_end.len() - 1)
    }

    /// Activities in by-end order starting at `first_visible(position)`.
    pub fn visible_from(&self, position: f64) -> impl Iterator<Item = &Activity> + '_ {
        self.by_end[self.first_visible(position)..]
            .iter()
            .map(move |&i| &self.activities[i])
    }

    /// Activities fully contained in `[lo, hi]`. Partial overlap does
    /// not count; intervals straddling either bound are excluded.
    pub fn activities_in(&self, (lo, hi): (f64, f64)) -> impl Iterator<Item = &Activity> + '_ {
        self.activities
            .iter()
            .filter(move |a| a.start >= lo && a.end <= hi)
    }

    /// Per-node energy sums over the activities fully contained in the
    /// range. Tx transmissions fill the Tx bucket; receptions and
    /// channel-activity detections fill the Rx bucket; missing energy
    /// readings contribute zero.
    pub fn energy_per_node(&self, range: (f64, f64)) -> Vec<NodeEnergy> {
        let mut totals = vec![NodeEnergy::default(); self.node_count()];

        for activity in self.activities_in(range) {
            let energy = activity.energy.unwrap_or(0.0);
            match activity.kind {
                ActivityKind::Tx => totals[activity.node].tx += energy,
                ActivityKind::Rx | ActivityKind::Cad { .. } => totals[activity.node].rx += energy,
                _ => {}
            }
        }

        totals
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeEnergy {
    pub tx: f64,
    pub rx: f64,
}

impl NodeEnergy {
    pub fn total(&self) -> f64 {
        self.tx + self.rx
    }
}

/// A user-dragged time range. `None` fields mean no selection; the drag
/// direction is not meaningful, so consumers read the normalized pair
/// through [`Selection::range`] and the stored fields are never swapped
/// in place.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Selection {
    start: Option<f64>,
    stop: Option<f64>,
}

impl Selection {
    pub fn begin(&mut self, time: f64) {
        self.start = Some(time);
        self.stop = Some(time);
    }

    pub fn update(&mut self, time: f64) {
        if self.start.is_some() {
            self.stop = Some(time);
        }
    }

    /// Finalizes the gesture. A zero-width drag collapses to the empty
    /// selection rather than producing a degenerate range.
    pub fn commit(&mut self) {
        if let (Some(start), Some(stop)) = (self.start, self.stop)
            && start == stop
        {
            self.clear();
        }
    }

    pub fn clear(&mut self) {
        self.start = None;
        self.stop = None;
    }

    /// Normalized `(min, max)` bounds, without mutating the stored
    /// drag order.
    pub fn range(&self) -> Option<(f64, f64)> {
        match (self.start, self.stop) {
            (Some(start), Some(stop)) => Some((start.min(stop), start.max(stop))),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.range().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(nodes: usize) -> Network {
        Network {
            nodes: (0..nodes as u64)
                .map(|id| Node {
                    id,
                    role: String::new(),
                })
                .collect(),
            modulations: vec![Modulation {
                name: "SF9".to_owned(),
                color: [0.8, 0.2, 0.4, 1.0],
            }],
        }
    }

    fn activity(start: f64, end: f64, node: usize, kind: ActivityKind) -> Activity {
        Activity {
            start,
            end,
            node,
            energy: None,
            kind,
        }
    }

    #[test]
    fn decodes_all_known_kinds_and_skips_unknown_tags() {
        let json = r#"{
            "network": {
                "nodes": [{"id": 0, "role": "BASE"}, {"id": 1, "role": "SENSOR"}],
                "modulations": [{"name": "SF9", "color": [0.1, 0.2, 0.3, 1.0]}]
            },
            "activities": [
                {"activity_type": "LWBRoundActivity", "start": 0.0, "end": 2.0, "node": 0,
                 "energy": null, "details": {"round_type": "SYNC", "modulation": 0}},
                {"activity_type": "LWBSlotActivity", "start": 0.1, "end": 0.4, "node": 1,
                 "energy": 0.5, "details": {"slot_type": "SLOT_SCHEDULE", "payload": 8}},
                {"activity_type": "CADActivity", "start": 0.2, "end": 0.3, "node": 1,
                 "energy": 0.01, "details": {"modulation": 0, "success": false}},
                {"activity_type": "RxActivity", "start": 0.4, "end": 0.6, "node": 0,
                 "energy": 0.2, "details": {"modulation": 0, "success": true}},
                {"activity_type": "TxActivity", "start": 0.4, "end": 0.6, "node": 1,
                 "energy": 0.3, "details": {"power": 10, "modulation": 0}},
                {"activity_type": "FancyNewActivity", "start": 0.7, "end": 0.8, "node": 0,
                 "energy": null, "details": {"whatever": 1}}
            ],
            "events": []
        }"#;

        let trace = Trace::from_json(json).unwrap();
        assert_eq!(trace.len(), 6);
        assert_eq!(trace.node_count(), 2);

        let kinds: Vec<_> = trace.activities().iter().map(|a| &a.kind).collect();
        assert!(matches!(kinds[0], ActivityKind::Round { .. }));
        assert!(matches!(
            kinds[1],
            ActivityKind::Slot {
                slot_type: SlotKind::SlotSchedule
            }
        ));
        assert!(matches!(kinds[2], ActivityKind::Cad { success: false }));
        assert_eq!(kinds[3], &ActivityKind::Rx);
        assert_eq!(kinds[4], &ActivityKind::Tx);
        assert_eq!(kinds[5], &ActivityKind::Unknown);
    }

    #[test]
    fn empty_activity_list_fails_fast() {
        assert!(matches!(
            Trace::new(network(1), vec![]),
            Err(Error::EmptyTrace)
        ));
    }

    #[test]
    fn node_index_out_of_range_is_rejected() {
        let result = Trace::new(network(1), vec![activity(0.0, 1.0, 3, ActivityKind::Tx)]);
        assert!(matches!(
            result,
            Err(Error::NodeOutOfRange { node: 3, .. })
        ));
    }

    #[test]
    fn inverted_interval_is_rejected() {
        let result = Trace::new(network(1), vec![activity(2.0, 1.0, 0, ActivityKind::Rx)]);
        assert!(matches!(result, Err(Error::InvertedInterval { .. })));
    }

    #[test]
    fn orderings_diverge_from_insertion_order() {
        let trace = Trace::new(
            network(1),
            vec![
                activity(3.0, 9.0, 0, ActivityKind::Tx),
                activity(1.0, 2.0, 0, ActivityKind::Rx),
                activity(2.0, 4.0, 0, ActivityKind::Tx),
            ],
        )
        .unwrap();

        let starts: Vec<f64> = trace.by_start().map(|a| a.start).collect();
        assert_eq!(starts, vec![1.0, 2.0, 3.0]);

        let ends: Vec<f64> = trace.by_end().map(|a| a.end).collect();
        assert_eq!(ends, vec![2.0, 4.0, 9.0]);

        assert_eq!(trace.extent(), (1.0, 9.0));
    }

    #[test]
    fn first_visible_over_sorted_ends() {
        let trace = Trace::new(
            network(1),
            vec![
                activity(0.0, 1.0, 0, ActivityKind::Tx),
                activity(0.0, 3.0, 0, ActivityKind::Tx),
                activity(0.0, 5.0, 0, ActivityKind::Tx),
                activity(0.0, 7.0, 0, ActivityKind::Tx),
            ],
        )
        .unwrap();

        assert_eq!(trace.first_visible(0.0), 0);
        assert_eq!(trace.first_visible(3.0), 2);
        assert_eq!(trace.first_visible(100.0), 3);
    }

    #[test]
    fn containment_excludes_partial_overlap() {
        let trace = Trace::new(
            network(1),
            vec![
                activity(0.0, 2.0, 0, ActivityKind::Tx),
                activity(1.0, 4.0, 0, ActivityKind::Rx),
                activity(2.0, 3.0, 0, ActivityKind::Tx),
            ],
        )
        .unwrap();

        let contained: Vec<(f64, f64)> = trace
            .activities_in((0.0, 3.0))
            .map(|a| (a.start, a.end))
            .collect();
        assert_eq!(contained, vec![(0.0, 2.0), (2.0, 3.0)]);
    }

    #[test]
    fn energy_aggregation_buckets_and_null_energy() {
        let mut activities = vec![
            activity(0.0, 1.0, 0, ActivityKind::Tx),
            activity(1.0, 2.0, 0, ActivityKind::Rx),
            activity(2.0, 3.0, 1, ActivityKind::Tx),
            activity(3.0, 4.0, 1, ActivityKind::Cad { success: true }),
            activity(
                4.0,
                5.0,
                0,
                ActivityKind::Round {
                    round_type: "SYNC".to_owned(),
                    modulation: 0,
                },
            ),
        ];
        activities[0].energy = Some(2.0);
        activities[1].energy = None;
        activities[2].energy = Some(3.0);
        activities[3].energy = Some(0.5);
        activities[4].energy = Some(100.0); // rounds are neither Tx nor Rx

        let trace = Trace::new(network(2), activities).unwrap();
        let totals = trace.energy_per_node((0.0, 10.0));

        assert_eq!(totals[0].tx, 2.0);
        assert_eq!(totals[0].rx, 0.0);
        assert_eq!(totals[1].tx, 3.0);
        assert_eq!(totals[1].rx, 0.5);
    }

    #[test]
    fn selection_zero_drag_collapses_on_commit() {
        let mut selection = Selection::default();
        selection.begin(5.0);
        selection.update(5.0);
        selection.commit();
        assert!(selection.is_empty());
        assert_eq!(selection.range(), None);
    }

    #[test]
    fn selection_range_normalizes_without_mutation() {
        let mut selection = Selection::default();
        selection.begin(8.0);
        selection.update(3.0);
        selection.commit();

        assert_eq!(selection.range(), Some((3.0, 8.0)));
        // A second read must see the same normalized bounds.
        assert_eq!(selection.range(), Some((3.0, 8.0)));
    }

    #[test]
    fn descriptor_text_per_kind() {
        assert_eq!(
            activity(0.0, 1.0, 0, ActivityKind::Cad { success: true }).descriptor(),
            Some("CAD (true)".to_owned())
        );
        assert_eq!(
            activity(0.0, 1.0, 0, ActivityKind::Tx).descriptor(),
            Some("Tx".to_owned())
        );
        assert_eq!(
            activity(0.0, 1.0, 0, ActivityKind::Unknown).descriptor(),
            None
        );
    }
}
