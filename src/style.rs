use iced::{Color, Font};
use palette::{FromColor, Hsva, Srgba};

use data::trace::{Modulation, SlotKind};

pub const MONO: Font = Font::MONOSPACE;
pub const TEXT_SIZE: f32 = 12.0;

/// Slot colors from the original flora_tools palette.
pub fn slot_color(kind: SlotKind) -> Color {
    match kind {
        SlotKind::Sync => Color::from_rgb8(255, 0, 255),
        SlotKind::RoundSchedule => Color::from_rgb8(102, 51, 153),
        SlotKind::Contention => Color::from_rgb8(240, 128, 128),
        SlotKind::SlotSchedule => Color::from_rgb8(153, 50, 204),
        SlotKind::Data => Color::from_rgb8(0, 191, 255),
        SlotKind::Ack => Color::from_rgb8(102, 205, 170),
        SlotKind::Empty => Color::from_rgb8(105, 105, 105),
    }
}

pub fn cad_color() -> Color {
    Color::from_rgb8(0, 0, 255)
}

pub fn rx_color() -> Color {
    Color::from_rgb8(100, 149, 237)
}

pub fn tx_color() -> Color {
    Color::from_rgb8(220, 20, 60)
}

pub fn modulation_color(modulation: &Modulation) -> Color {
    let [r, g, b, a] = modulation.color;
    Color::from_rgba(r, g, b, a)
}

/// Darkens a fill, used for unsuccessful CAD attempts.
pub fn dimmed(color: Color, amount: f32) -> Color {
    let mut hsva = Hsva::from_color(Srgba::new(color.r, color.g, color.b, color.a));
    hsva.value = (hsva.value * (1.0 - amount)).clamp(0.0, 1.0);

    let rgba = Srgba::from_color(hsva);
    Color::from_rgba(rgba.red, rgba.green, rgba.blue, rgba.alpha)
}

pub fn with_alpha(color: Color, alpha: f32) -> Color {
    Color { a: alpha, ..color }
}
