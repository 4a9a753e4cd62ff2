use std::cell::RefCell;

use data::trace::{ActivityKind, NodeEnergy, Selection, Trace};
use iced::theme::palette::Extended;
use iced::widget::canvas;
use iced::{Element, Length, Point, Rectangle, Renderer, Theme, mouse};

use crate::style;

pub mod labels;
pub mod viewport;

use labels::{LabelPool, TickPool};
use viewport::Viewport;

/// Height fractions of a node band per activity kind, matching the
/// original visualizer's stacking: rounds in the back, slots in the
/// middle, radio events in front.
const ROUND_BAND: (f32, f32) = (0.0, 0.9);
const SLOT_BAND: (f32, f32) = (0.3, 0.6);
const RADIO_BAND: (f32, f32) = (0.6, 0.3);

const CAD_FAILURE_DIM: f32 = 0.5;
const SELECTION_ALPHA: f32 = 0.15;

#[derive(Debug, Clone)]
pub enum Message {
    Panned { delta_x: f32, width: f32 },
    Zoomed { factor: f64, cursor_x: f32, width: f32 },
    SelectionStarted { time: f64 },
    SelectionMoved { time: f64 },
    SelectionEnded,
    SelectionCleared,
    ViewReset,
}

/// What the application shell should do after a timeline update.
#[derive(Debug, Clone)]
pub enum Action {
    SelectionCommitted(Vec<NodeEnergy>),
    SelectionCleared,
}

/// Gesture state machine: left-drag pans, right-drag selects. Held by
/// the canvas as widget-local state and advanced through [`transition`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Interaction {
    #[default]
    Idle,
    Panning { last: Point },
    Selecting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Pressed {
        position: Point,
        local_x: f32,
        select: bool,
    },
    Moved {
        position: Point,
        local_x: f32,
    },
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    PanBy { delta_x: f32 },
    SelectStart { x: f32 },
    SelectMove { x: f32 },
    SelectEnd,
}

/// Pure transition of the gesture state machine. A press is superseded
/// by the next press only after a release; unmatched events leave the
/// state untouched.
pub fn transition(state: Interaction, event: PointerEvent) -> (Interaction, Option<Gesture>) {
    match (state, event) {
        (
            Interaction::Idle,
            PointerEvent::Pressed {
                position,
                local_x,
                select,
            },
        ) => {
            if select {
                (Interaction::Selecting, Some(Gesture::SelectStart { x: local_x }))
            } else {
                (Interaction::Panning { last: position }, None)
            }
        }
        (Interaction::Panning { last }, PointerEvent::Moved { position, .. }) => (
            Interaction::Panning { last: position },
            Some(Gesture::PanBy {
                delta_x: position.x - last.x,
            }),
        ),
        (Interaction::Selecting, PointerEvent::Moved { local_x, .. }) => (
            Interaction::Selecting,
            Some(Gesture::SelectMove { x: local_x }),
        ),
        (Interaction::Panning { .. }, PointerEvent::Released) => (Interaction::Idle, None),
        (Interaction::Selecting, PointerEvent::Released) => {
            (Interaction::Idle, Some(Gesture::SelectEnd))
        }
        (state, _) => (state, None),
    }
}

#[derive(Default)]
struct Caches {
    main: canvas::Cache,
    labels: canvas::Cache,
    overlay: canvas::Cache,
}

/// Interactive timeline for one loaded trace. Owns the viewport and
/// selection; loading a new trace replaces the whole instance.
pub struct Timeline {
    trace: Trace,
    viewport: Viewport,
    selection: Selection,
    label_pool: RefCell<LabelPool>,
    tick_pool: RefCell<TickPool>,
    cache: Caches,
}

impl Timeline {
    pub fn new(trace: Trace) -> Self {
        let (begin, end) = trace.extent();

        Self {
            trace,
            viewport: Viewport::fit_to_extent(begin, end, 1.0),
            selection: Selection::default(),
            label_pool: RefCell::new(LabelPool::default()),
            tick_pool: RefCell::new(TickPool::default()),
            cache: Caches::default(),
        }
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn update(&mut self, message: Message) -> Option<Action> {
        match message {
            Message::Panned { delta_x, width } => {
                self.viewport.pan(delta_x, width);
                self.invalidate();
                None
            }
            Message::Zoomed {
                factor,
                cursor_x,
                width,
            } => {
                self.viewport.zoom_at(cursor_x, factor, width);
                self.invalidate();
                None
            }
            Message::SelectionStarted { time } => {
                self.selection.begin(self.clip(time));
                self.cache.overlay.clear();
                None
            }
            Message::SelectionMoved { time } => {
                self.selection.update(self.clip(time));
                self.cache.overlay.clear();
                None
            }
            Message::SelectionEnded => {
                self.selection.commit();
                self.cache.overlay.clear();

                match self.selection.range() {
                    Some(range) => {
                        Some(Action::SelectionCommitted(self.trace.energy_per_node(range)))
                    }
                    None => Some(Action::SelectionCleared),
                }
            }
            Message::SelectionCleared => {
                self.selection.clear();
                self.cache.overlay.clear();
                Some(Action::SelectionCleared)
            }
            Message::ViewReset => {
                let (begin, end) = self.trace.extent();
                self.viewport = Viewport::fit_to_extent(begin, end, 1.0);
                self.invalidate();
                None
            }
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        canvas::Canvas::new(self)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    /// Clamps a dragged time to the actual viewport bounds so a cursor
    /// leaving the canvas cannot extend the selection past what is
    /// visible.
    fn clip(&self, time: f64) -> f64 {
        let (lo, hi) = self.viewport.visible_range();
        time.clamp(lo, hi)
    }

    fn invalidate(&mut self) {
        self.cache.main.clear();
        self.cache.labels.clear();
        self.cache.overlay.clear();
    }

    fn publish(&self, gesture: Gesture, bounds: Rectangle) -> canvas::Action<Message> {
        let message = match gesture {
            Gesture::PanBy { delta_x } => Message::Panned {
                delta_x,
                width: bounds.width,
            },
            Gesture::SelectStart { x } => Message::SelectionStarted {
                time: self.viewport.x_to_time(x, bounds.width),
            },
            Gesture::SelectMove { x } => Message::SelectionMoved {
                time: self.viewport.x_to_time(x, bounds.width),
            },
            Gesture::SelectEnd => Message::SelectionEnded,
        };

        canvas::Action::publish(message)
    }

    fn draw_activities(&self, frame: &mut canvas::Frame) {
        let width = frame.width();
        let height = frame.height();
        let (view_start, view_end) = self.viewport.visible_range();
        let band = Viewport::node_band(height, self.trace.node_count());
        let modulations = &self.trace.network().modulations;

        for activity in self.trace.by_start() {
            if activity.end < view_start || activity.start > view_end {
                continue;
            }

            let (offset, fraction, color) = match &activity.kind {
                ActivityKind::Round { modulation, .. } => {
                    let color = style::modulation_color(&modulations[*modulation]);
                    (ROUND_BAND.0, ROUND_BAND.1, color)
                }
                ActivityKind::Slot { slot_type } => {
                    (SLOT_BAND.0, SLOT_BAND.1, style::slot_color(*slot_type))
                }
                ActivityKind::Cad { success } => {
                    let color = if *success {
                        style::cad_color()
                    } else {
                        style::dimmed(style::cad_color(), CAD_FAILURE_DIM)
                    };
                    (RADIO_BAND.0, RADIO_BAND.1, color)
                }
                ActivityKind::Rx => (RADIO_BAND.0, RADIO_BAND.1, style::rx_color()),
                ActivityKind::Tx => (RADIO_BAND.0, RADIO_BAND.1, style::tx_color()),
                ActivityKind::Unknown => continue,
            };

            let x = self.viewport.time_to_x(activity.start, width);
            let w = ((activity.end - activity.start) * f64::from(width) / self.viewport.zoom) as f32;
            let y = Viewport::node_to_y(activity.node, height, self.trace.node_count())
                + offset * band;

            frame.fill_rectangle(
                Point::new(x, y),
                iced::Size::new(w, fraction * band),
                color,
            );
        }
    }

    fn draw_ticks(&self, frame: &mut canvas::Frame, palette: &Extended) {
        let width = frame.width();
        let height = frame.height();

        let mut ticks = self.tick_pool.borrow_mut();
        ticks.fill(&self.viewport);

        for slot in ticks.slots() {
            let x = self.viewport.time_to_x(slot.time, width);
            if !(0.0..=width).contains(&x) {
                continue;
            }

            if slot.major {
                frame.stroke(
                    &canvas::Path::line(Point::new(x, 0.0), Point::new(x, height)),
                    canvas::Stroke::default()
                        .with_color(style::with_alpha(palette.background.weak.color, 0.6))
                        .with_width(1.0),
                );
                frame.fill_text(canvas::Text {
                    content: slot.label.clone(),
                    position: Point::new(x + 3.0, height - style::TEXT_SIZE),
                    color: palette.background.base.text,
                    font: style::MONO,
                    size: style::TEXT_SIZE.into(),
                    ..Default::default()
                });
            } else {
                frame.stroke(
                    &canvas::Path::line(Point::new(x, height - 6.0), Point::new(x, height)),
                    canvas::Stroke::default()
                        .with_color(style::with_alpha(palette.background.weak.color, 0.8))
                        .with_width(1.0),
                );
            }
        }
    }

    fn draw_labels(&self, frame: &mut canvas::Frame, palette: &Extended) {
        let mut pool = self.label_pool.borrow_mut();
        pool.fill(&self.trace, &self.viewport, frame.width(), frame.height());

        for slot in pool.visible() {
            frame.fill_text(canvas::Text {
                content: slot.text.clone(),
                position: Point::new(slot.x, slot.y),
                color: palette.background.base.text,
                font: style::MONO,
                size: style::TEXT_SIZE.into(),
                align_x: iced::Alignment::Center.into(),
                align_y: iced::Alignment::Center.into(),
                ..Default::default()
            });
        }
    }

    fn draw_selection(&self, frame: &mut canvas::Frame, palette: &Extended) {
        let Some((lo, hi)) = self.selection.range() else {
            return;
        };

        let width = frame.width();
        let height = frame.height();
        let x0 = self.viewport.time_to_x(lo, width).max(0.0);
        let x1 = self.viewport.time_to_x(hi, width).min(width);
        if x1 <= x0 {
            return;
        }

        let accent = palette.primary.base.color;

        frame.fill_rectangle(
            Point::new(x0, 0.0),
            iced::Size::new(x1 - x0, height),
            style::with_alpha(accent, SELECTION_ALPHA),
        );

        for x in [x0, x1] {
            frame.stroke(
                &canvas::Path::line(Point::new(x, 0.0), Point::new(x, height)),
                canvas::Stroke::default()
                    .with_color(style::with_alpha(accent, 0.8))
                    .with_width(1.0),
            );
        }
    }
}

impl canvas::Program<Message> for Timeline {
    type State = Interaction;

    fn update(
        &self,
        interaction: &mut Interaction,
        event: &iced::Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<canvas::Action<Message>> {
        match event {
            iced::Event::Mouse(mouse::Event::ButtonPressed(button)) => {
                let select = match button {
                    mouse::Button::Left => false,
                    mouse::Button::Right => true,
                    _ => return None,
                };
                let position = cursor.position_over(bounds)?;

                let (next, gesture) = transition(
                    *interaction,
                    PointerEvent::Pressed {
                        position,
                        local_x: position.x - bounds.x,
                        select,
                    },
                );
                *interaction = next;
                gesture.map(|gesture| self.publish(gesture, bounds))
            }
            iced::Event::Mouse(mouse::Event::CursorMoved { position }) => {
                if *interaction == Interaction::Idle {
                    return None;
                }

                let local_x = (position.x - bounds.x).clamp(0.0, bounds.width);
                let (next, gesture) = transition(
                    *interaction,
                    PointerEvent::Moved {
                        position: *position,
                        local_x,
                    },
                );
                *interaction = next;
                gesture.map(|gesture| self.publish(gesture, bounds))
            }
            iced::Event::Mouse(mouse::Event::ButtonReleased(
                mouse::Button::Left | mouse::Button::Right,
            )) => {
                let (next, gesture) = transition(*interaction, PointerEvent::Released);
                *interaction = next;
                gesture.map(|gesture| self.publish(gesture, bounds))
            }
            iced::Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                let position = cursor.position_in(bounds)?;
                let lines = match delta {
                    mouse::ScrollDelta::Lines { y, .. } => *y,
                    mouse::ScrollDelta::Pixels { y, .. } => *y / 20.0,
                };

                Some(canvas::Action::publish(Message::Zoomed {
                    factor: viewport::wheel_zoom_factor(lines),
                    cursor_x: position.x,
                    width: bounds.width,
                }))
            }
            _ => None,
        }
    }

    fn draw(
        &self,
        _interaction: &Interaction,
        renderer: &Renderer,
        theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        if bounds.width < 1.0 || bounds.height < 1.0 {
            return vec![];
        }

        let palette = theme.extended_palette();

        let main = self
            .cache
            .main
            .draw(renderer, bounds.size(), |frame| self.draw_activities(frame));

        let labels = self.cache.labels.draw(renderer, bounds.size(), |frame| {
            self.draw_ticks(frame, palette);
            self.draw_labels(frame, palette);
        });

        let overlay = self.cache.overlay.draw(renderer, bounds.size(), |frame| {
            self.draw_selection(frame, palette);
        });

        vec![main, labels, overlay]
    }

    fn mouse_interaction(
        &self,
        interaction: &Interaction,
        _bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        match interaction {
            Interaction::Panning { .. } => mouse::Interaction::Grabbing,
            Interaction::Selecting => mouse::Interaction::Crosshair,
            Interaction::Idle => mouse::Interaction::default(),
        }
    }
}
