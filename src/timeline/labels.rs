use std::fmt::Write;

use data::trace::Trace;

use super::viewport::Viewport;

pub const LABEL_SLOTS: usize = 200;
pub const TICK_SLOTS: usize = 110;

/// Approximate fixed-width glyph budget: an activity gets a descriptor
/// only when its on-screen width fits the text at this many pixels per
/// character.
const GLYPH_WIDTH: f32 = 12.0;

/// Upper bound on activities examined per fill pass, as a multiple of
/// the pool capacity. Keeps a pass bounded when nearly everything on
/// screen is too narrow to label.
const SCAN_FACTOR: usize = 32;

#[derive(Debug, Clone, Default)]
pub struct LabelSlot {
    pub visible: bool,
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// Fixed arena of descriptor label slots, reused across frames so a
/// pan or zoom never allocates per label. Slots not assigned in a pass
/// are hidden, never left showing stale text.
#[derive(Debug)]
pub struct LabelPool {
    slots: Vec<LabelSlot>,
}

impl Default for LabelPool {
    fn default() -> Self {
        Self::new(LABEL_SLOTS)
    }
}

impl LabelPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![LabelSlot::default(); capacity],
        }
    }

    /// Walks the by-end order from the first possibly-visible activity
    /// and assigns a slot to every activity wide enough on screen for
    /// its descriptor. Stops when the pool or the scan budget is
    /// exhausted; everything past that is dropped for this frame.
    pub fn fill(&mut self, trace: &Trace, viewport: &Viewport, width: f32, height: f32) {
        for slot in &mut self.slots {
            slot.visible = false;
        }

        let (view_start, view_end) = viewport.visible_range();
        let band = Viewport::node_band(height, trace.node_count());

        let mut next = 0;
        let mut scanned = 0;

        for activity in trace.visible_from(view_start) {
            if next >= self.slots.len() || scanned >= self.slots.len() * SCAN_FACTOR {
                break;
            }
            scanned += 1;

            let visible_start = activity.start.max(view_start);
            let visible_end = activity.end.min(view_end);
            if visible_end <= visible_start {
                continue;
            }

            let Some(text) = activity.descriptor() else {
                continue;
            };

            let span_px = ((visible_end - visible_start) * f64::from(width) / viewport.zoom) as f32;
            if span_px < GLYPH_WIDTH * text.len() as f32 {
                continue;
            }

            let slot = &mut self.slots[next];
            slot.visible = true;
            slot.text = text;
            slot.x = viewport.time_to_x((visible_start + visible_end) / 2.0, width);
            slot.y = Viewport::node_to_y(activity.node, height, trace.node_count()) + band / 2.0;
            next += 1;
        }
    }

    pub fn visible(&self) -> impl Iterator<Item = &LabelSlot> {
        self.slots.iter().filter(|slot| slot.visible)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TickSlot {
    pub time: f64,
    pub major: bool,
    /// Numeric label, empty on minor ticks.
    pub label: String,
}

/// Fixed arena of tick marks laid out at minor-step spacing; a pure
/// function of `(position, zoom)` recomputed on every viewport change.
#[derive(Debug)]
pub struct TickPool {
    slots: Vec<TickSlot>,
}

impl Default for TickPool {
    fn default() -> Self {
        Self::new(TICK_SLOTS)
    }
}

impl TickPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![TickSlot::default(); capacity],
        }
    }

    /// Step sizes follow the zoom's order of magnitude: one major step
    /// per power of ten, ten minors per major, label precision growing
    /// as the view zooms in.
    pub fn fill(&mut self, viewport: &Viewport) {
        let magnitude = viewport.zoom.log10().floor();
        let major_step = 10f64.powf(magnitude);
        let minor_step = 10f64.powf(magnitude - 1.0);
        let decimals = (-magnitude as i32).max(0) as usize;

        let (view_start, _) = viewport.visible_range();
        let origin = (view_start / major_step).floor() * major_step;

        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.time = origin + i as f64 * minor_step;
            slot.major = i % 10 == 0;
            slot.label.clear();
            if slot.major {
                let _ = write!(slot.label, "{:.*}", decimals, slot.time);
            }
        }
    }

    pub fn slots(&self) -> &[TickSlot] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data::trace::{Activity, ActivityKind, Modulation, Network, Node, Trace};

    fn trace_of(activities: Vec<Activity>) -> Trace {
        let nodes = activities.iter().map(|a| a.node).max().unwrap_or(0) + 1;
        Trace::new(
            Network {
                nodes: (0..nodes as u64)
                    .map(|id| Node {
                        id,
                        role: String::new(),
                    })
                    .collect(),
                modulations: vec![Modulation {
                    name: "SF5".to_owned(),
                    color: [0.5, 0.5, 0.5, 1.0],
                }],
            },
            activities,
        )
        .unwrap()
    }

    fn tx(start: f64, end: f64) -> Activity {
        Activity {
            start,
            end,
            node: 0,
            energy: None,
            kind: ActivityKind::Tx,
        }
    }

    #[test]
    fn wide_activity_gets_a_label() {
        // "Tx" needs 24 px; 1 time unit at zoom 10 over 800 px is 80 px.
        let trace = trace_of(vec![tx(4.0, 5.0)]);
        let viewport = Viewport {
            position: 5.0,
            zoom: 10.0,
        };

        let mut pool = LabelPool::new(8);
        pool.fill(&trace, &viewport, 800.0, 100.0);

        let labels: Vec<&str> = pool.visible().map(|slot| slot.text.as_str()).collect();
        assert_eq!(labels, vec!["Tx"]);
    }

    #[test]
    fn narrow_activity_is_suppressed() {
        // 0.1 time units at zoom 100 over 800 px is 0.8 px, far under
        // the 24 px "Tx" needs.
        let trace = trace_of(vec![tx(4.0, 4.1)]);
        let viewport = Viewport {
            position: 5.0,
            zoom: 100.0,
        };

        let mut pool = LabelPool::new(8);
        pool.fill(&trace, &viewport, 800.0, 100.0);

        assert_eq!(pool.visible().count(), 0);
    }

    #[test]
    fn offscreen_activity_is_skipped_not_labeled() {
        let trace = trace_of(vec![tx(100.0, 101.0), tx(4.0, 5.0)]);
        let viewport = Viewport {
            position: 5.0,
            zoom: 10.0,
        };

        let mut pool = LabelPool::new(8);
        pool.fill(&trace, &viewport, 800.0, 100.0);

        assert_eq!(pool.visible().count(), 1);
    }

    #[test]
    fn pool_exhaustion_drops_excess_labels() {
        let activities = (0..6).map(|i| tx(i as f64, i as f64 + 1.0)).collect();
        let trace = trace_of(activities);
        let viewport = Viewport {
            position: 3.0,
            zoom: 10.0,
        };

        let mut pool = LabelPool::new(4);
        pool.fill(&trace, &viewport, 1600.0, 100.0);

        assert_eq!(pool.visible().count(), 4);
    }

    #[test]
    fn stale_slots_are_hidden_on_refill() {
        let trace = trace_of(vec![tx(4.0, 5.0)]);
        let mut pool = LabelPool::new(8);

        pool.fill(
            &trace,
            &Viewport {
                position: 5.0,
                zoom: 10.0,
            },
            800.0,
            100.0,
        );
        assert_eq!(pool.visible().count(), 1);

        // Pan far away; the previously assigned slot must disappear.
        pool.fill(
            &trace,
            &Viewport {
                position: 500.0,
                zoom: 10.0,
            },
            800.0,
            100.0,
        );
        assert_eq!(pool.visible().count(), 0);
    }

    #[test]
    fn tick_label_precision_follows_zoom() {
        let mut pool = TickPool::default();

        // zoom 0.05 => magnitude -2 => two decimal places.
        pool.fill(&Viewport {
            position: 1.0,
            zoom: 0.05,
        });
        let major = pool.slots().iter().find(|slot| slot.major).unwrap();
        assert_eq!(major.label.split('.').nth(1).map(str::len), Some(2));

        // zoom 500 => magnitude 2 => integer labels.
        pool.fill(&Viewport {
            position: 1000.0,
            zoom: 500.0,
        });
        let major = pool.slots().iter().find(|slot| slot.major).unwrap();
        assert!(!major.label.contains('.'));
    }

    #[test]
    fn every_tenth_tick_is_major_and_labeled() {
        let mut pool = TickPool::default();
        pool.fill(&Viewport {
            position: 50.0,
            zoom: 100.0,
        });

        for (i, slot) in pool.slots().iter().enumerate() {
            assert_eq!(slot.major, i % 10 == 0);
            assert_eq!(slot.major, !slot.label.is_empty());
        }

        // Minor spacing is a tenth of the major step.
        let step = pool.slots()[1].time - pool.slots()[0].time;
        assert!((step - 10.0).abs() < 1e-9);
    }

    #[test]
    fn tick_origin_snaps_to_major_step_below_view_start() {
        let mut pool = TickPool::default();
        pool.fill(&Viewport {
            position: 57.0,
            zoom: 10.0,
        });

        // view starts at 52; origin snaps down to 50.
        assert!((pool.slots()[0].time - 50.0).abs() < 1e-9);
    }
}
