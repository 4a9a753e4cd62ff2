use std::path::PathBuf;

use iced::widget::{center, column, container, row, text};
use iced::{Element, Length, Size, Subscription, Task, keyboard, window};

use data::config;
use data::trace::{NodeEnergy, Trace};

mod stats;
mod style;
mod timeline;

use timeline::Timeline;

fn main() -> iced::Result {
    if let Err(err) = setup_logger() {
        eprintln!("failed to initialize logging: {err}");
    }

    iced::application(FloraTrace::new, FloraTrace::update, FloraTrace::view)
        .title("FloraTrace")
        .theme(FloraTrace::theme)
        .subscription(FloraTrace::subscription)
        .window(window::Settings {
            exit_on_close_request: false,
            ..window::Settings::default()
        })
        .antialiasing(true)
        .run()
}

fn setup_logger() -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.target(),
                record.level(),
                message,
            ));
        })
        .level(log::LevelFilter::Info)
        .level_for("wgpu_core", log::LevelFilter::Warn)
        .level_for("wgpu_hal", log::LevelFilter::Warn)
        .level_for("iced_wgpu", log::LevelFilter::Warn)
        .chain(std::io::stdout())
        .chain(data::log::file()?)
        .apply()?;

    Ok(())
}

enum Screen {
    /// Nothing loaded yet; the window is one big drop target.
    Waiting,
    Loaded { timeline: Timeline },
}

#[derive(Debug, Clone)]
enum Message {
    FileDropped(PathBuf),
    TraceLoaded(Result<(PathBuf, Trace), String>),
    Timeline(timeline::Message),
    WindowResized(Size),
    CloseRequested(window::Id),
}

struct FloraTrace {
    state: config::State,
    screen: Screen,
    breakdown: Option<Vec<NodeEnergy>>,
    status: Option<String>,
}

impl FloraTrace {
    fn new() -> (Self, Task<Message>) {
        let state = config::load();

        let restore_window = match state.window_size {
            Some((width, height)) => window::latest()
                .and_then(move |id| window::resize(id, Size::new(width, height))),
            None => Task::none(),
        };

        let mut app = Self {
            state,
            screen: Screen::Waiting,
            breakdown: None,
            status: None,
        };

        // A path on the command line wins over the remembered trace.
        let initial = std::env::args()
            .nth(1)
            .map(PathBuf::from)
            .or_else(|| app.state.last_trace.clone());

        let load = match initial {
            Some(path) => app.load(path),
            None => Task::none(),
        };

        (app, Task::batch([restore_window, load]))
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::FileDropped(path) => self.load(path),
            Message::TraceLoaded(Ok((path, trace))) => {
                log::info!(
                    "loaded {}: {} nodes, {} activities",
                    path.display(),
                    trace.node_count(),
                    trace.len(),
                );

                // The previous timeline, its selection included, is
                // discarded wholesale.
                self.screen = Screen::Loaded {
                    timeline: Timeline::new(trace),
                };
                self.breakdown = None;
                self.status = None;

                self.state.last_trace = Some(path);
                if let Err(err) = config::save(&self.state) {
                    log::warn!("failed to persist state: {err}");
                }

                Task::none()
            }
            Message::TraceLoaded(Err(error)) => {
                log::error!("trace load failed: {error}");
                self.status = Some(error);
                Task::none()
            }
            Message::Timeline(message) => {
                if let Screen::Loaded { timeline } = &mut self.screen {
                    match timeline.update(message) {
                        Some(timeline::Action::SelectionCommitted(breakdown)) => {
                            self.breakdown = Some(breakdown);
                        }
                        Some(timeline::Action::SelectionCleared) => {
                            self.breakdown = None;
                        }
                        None => {}
                    }
                }
                Task::none()
            }
            Message::WindowResized(size) => {
                self.state.window_size = Some((size.width, size.height));
                Task::none()
            }
            Message::CloseRequested(id) => {
                if let Err(err) = config::save(&self.state) {
                    log::warn!("failed to persist state: {err}");
                }
                window::close(id)
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let content: Element<'_, Message> = match &self.screen {
            Screen::Waiting => center(
                column![
                    text("FloraTrace").size(20),
                    text("Drop a simulation trace (JSON) anywhere in this window").size(14),
                ]
                .spacing(8)
                .align_x(iced::Alignment::Center),
            )
            .into(),
            Screen::Loaded { timeline } => row![
                container(timeline.view().map(Message::Timeline))
                    .width(Length::FillPortion(4))
                    .height(Length::Fill),
                container(stats::view(self.breakdown.as_deref()))
                    .width(Length::FillPortion(1))
                    .height(Length::Fill),
            ]
            .into(),
        };

        match &self.status {
            Some(status) => column![
                container(content).height(Length::Fill),
                text(status).size(style::TEXT_SIZE).style(text::danger),
            ]
            .into(),
            None => content,
        }
    }

    fn theme(&self) -> iced::Theme {
        self.state.selected_theme.0.clone()
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            iced::event::listen_with(|event, _status, _window| match event {
                iced::Event::Window(window::Event::FileDropped(path)) => {
                    Some(Message::FileDropped(path))
                }
                _ => None,
            }),
            keyboard::listen().filter_map(|event| match event {
                keyboard::Event::KeyPressed { key, .. } => match key.as_ref() {
                    keyboard::Key::Character("r") => {
                        Some(Message::Timeline(timeline::Message::ViewReset))
                    }
                    keyboard::Key::Named(keyboard::key::Named::Escape) => {
                        Some(Message::Timeline(timeline::Message::SelectionCleared))
                    }
                    _ => None,
                },
                _ => None,
            }),
            window::resize_events().map(|(_id, size)| Message::WindowResized(size)),
            window::close_requests().map(Message::CloseRequested),
        ])
    }

    fn load(&mut self, path: PathBuf) -> Task<Message> {
        log::info!("loading trace from {}", path.display());
        self.status = None;
        Task::perform(load_trace(path), Message::TraceLoaded)
    }
}

async fn load_trace(path: PathBuf) -> Result<(PathBuf, Trace), String> {
    let loaded = tokio::task::spawn_blocking(move || {
        let trace = Trace::from_file(&path)?;
        Ok::<_, data::trace::Error>((path, trace))
    })
    .await
    .map_err(|err| err.to_string())?;

    loaded.map_err(|err| err.to_string())
}
