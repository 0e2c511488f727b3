/// Colours for statuses and teams
use iced::widget::{container, pick_list};
use iced::{Border, Color, Theme};

use crate::state::data::{Status, Team};

pub fn status_color(status: Status) -> Color {
    match status {
        Status::New => Color::from_rgb(0.26, 0.52, 0.96),
        Status::InProgress => Color::from_rgb(0.96, 0.65, 0.14),
        Status::Done => Color::from_rgb(0.20, 0.66, 0.33),
        Status::NotImpacted => Color::from_rgb(0.55, 0.55, 0.58),
    }
}

pub fn team_color(team: Team) -> Color {
    match team {
        Team::QuotationToPricing => Color::from_rgb(0.10, 0.60, 0.62),
        Team::PricingToQuotation => Color::from_rgb(0.55, 0.36, 0.80),
    }
}

/// Items in progress keep the neutral card background
fn item_tint(status: Status) -> Option<Color> {
    match status {
        Status::InProgress => None,
        other => Some(status_color(other)),
    }
}

/// Card of one test case
pub fn item(theme: &Theme, team: Team, status: Status, removing: bool) -> container::Style {
    let palette = theme.extended_palette();
    let mut background = palette.background.weak.color;
    if let Some(tint) = item_tint(status) {
        background = mix(background, tint, 0.18);
    }

    let mut text = palette.background.base.text;
    if removing {
        background.a = 0.35;
        text.a = 0.35;
    }

    container::Style {
        text_color: Some(text),
        background: Some(background.into()),
        border: Border {
            color: team_color(team),
            width: 2.0,
            radius: 8.0.into(),
        },
        ..container::Style::default()
    }
}

/// Status picker of one test case
pub fn status_select(theme: &Theme, state: pick_list::Status, status: Status) -> pick_list::Style {
    let mut style = pick_list::default(theme, state);
    let color = status_color(status);
    style.background = mix(theme.palette().background, color, 0.30).into();
    style.border.color = color;
    style
}

/// Header band above the list
pub fn header(theme: &Theme) -> container::Style {
    let palette = theme.extended_palette();
    container::Style {
        background: Some(palette.background.strong.color.into()),
        text_color: Some(palette.background.strong.text),
        border: Border {
            radius: 8.0.into(),
            ..Border::default()
        },
        ..container::Style::default()
    }
}

fn mix(a: Color, b: Color, amount: f32) -> Color {
    Color {
        r: a.r + (b.r - a.r) * amount,
        g: a.g + (b.g - a.g) * amount,
        b: a.b + (b.b - a.b) * amount,
        a: a.a,
    }
}
