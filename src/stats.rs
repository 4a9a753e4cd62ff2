use data::trace::NodeEnergy;
use iced::widget::{Space, center, column, container, row, text};
use iced::{Background, Element, Length};

use crate::style;

/// Per-node energy breakdown for the committed selection. Pure
/// presentation: the aggregation itself happens in the trace model.
pub fn view<'a, Message: 'a>(breakdown: Option<&'a [NodeEnergy]>) -> Element<'a, Message> {
    let Some(nodes) = breakdown else {
        return center(text("No selection").size(style::TEXT_SIZE)).into();
    };

    let rows = nodes
        .iter()
        .enumerate()
        .map(|(node, energy)| node_row(node, energy))
        .collect::<Vec<_>>();

    container(column(rows).spacing(8).padding(8))
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn node_row<'a, Message: 'a>(node: usize, energy: &NodeEnergy) -> Element<'a, Message> {
    if energy.total() == 0.0 {
        return column![
            text(format!("Node {node}")).size(style::TEXT_SIZE),
            text("(no energy)").size(style::TEXT_SIZE),
        ]
        .spacing(2)
        .into();
    }

    column![
        text(format!(
            "Node {node} ({} mJ)",
            to_precision(energy.total(), 2)
        ))
        .size(style::TEXT_SIZE),
        text(format!("Tx: {} mJ", to_precision(energy.tx, 6))).size(style::TEXT_SIZE),
        text(format!("Rx: {} mJ", to_precision(energy.rx, 6))).size(style::TEXT_SIZE),
        ratio_bar(energy),
    ]
    .spacing(2)
    .into()
}

/// Horizontal Tx vs Rx share, in the same colors as the timeline rects.
fn ratio_bar<'a, Message: 'a>(energy: &NodeEnergy) -> Element<'a, Message> {
    let total = energy.total();
    let tx_share = ((energy.tx / total) * 1000.0).round() as u16;
    let rx_share = 1000u16.saturating_sub(tx_share);

    let segment = |color: iced::Color, portion: u16| {
        container(Space::new().width(Length::Fill).height(Length::Fixed(6.0)))
            .style(move |_| container::Style {
                background: Some(Background::Color(color)),
                ..container::Style::default()
            })
            .width(Length::FillPortion(portion.max(1)))
    };

    row![
        segment(style::tx_color(), tx_share),
        segment(style::rx_color(), rx_share),
    ]
    .width(Length::Fill)
    .into()
}

/// Significant-digit formatting in the style of JavaScript's
/// `toPrecision`, without scientific notation for the magnitudes energy
/// sums take in practice.
fn to_precision(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return "0".to_owned();
    }

    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (digits as i32 - 1 - magnitude).max(0) as usize;
    format!("{value:.decimals$}")
}
