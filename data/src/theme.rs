use iced_core::{
    Color, Theme as IcedTheme,
    theme::{Custom, Palette},
};
use serde::{Deserialize, Serialize};

/// Wrapper so the selected iced theme can live in the persisted state.
#[derive(Debug, Clone)]
pub struct Theme(pub IcedTheme);

impl Default for Theme {
    fn default() -> Self {
        Self(IcedTheme::Custom(custom_theme().into()))
    }
}

pub fn custom_theme() -> Custom {
    Custom::new(
        "floratrace".to_string(),
        Palette {
            background: Color::from_rgb8(20, 22, 27),
            text: Color::from_rgb8(199, 203, 208),
            primary: Color::from_rgb8(100, 149, 237),
            success: Color::from_rgb8(81, 205, 160),
            danger: Color::from_rgb8(220, 20, 60),
            warning: Color::from_rgb8(238, 216, 139),
        },
    )
}

impl Serialize for Theme {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let theme_str = match self.0 {
            IcedTheme::Ferra => "ferra",
            IcedTheme::Dark => "dark",
            IcedTheme::Light => "light",
            IcedTheme::Dracula => "dracula",
            IcedTheme::Nord => "nord",
            IcedTheme::SolarizedLight => "solarized_light",
            IcedTheme::SolarizedDark => "solarized_dark",
            IcedTheme::GruvboxLight => "gruvbox_light",
            IcedTheme::GruvboxDark => "gruvbox_dark",
            IcedTheme::TokyoNight => "tokyo_night",
            IcedTheme::TokyoNightStorm => "tokyo_night_storm",
            IcedTheme::TokyoNightLight => "tokyo_night_light",
            IcedTheme::KanagawaWave => "kanagawa_wave",
            IcedTheme::KanagawaDragon => "kanagawa_dragon",
            IcedTheme::KanagawaLotus => "kanagawa_lotus",
            _ => "floratrace",
        };
        theme_str.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Theme {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let theme_str = String::deserialize(deserializer)?;
        let theme = match theme_str.as_str() {
            "ferra" => IcedTheme::Ferra,
            "dark" => IcedTheme::Dark,
            "light" => IcedTheme::Light,
            "dracula" => IcedTheme::Dracula,
            "nord" => IcedTheme::Nord,
            "solarized_light" => IcedTheme::SolarizedLight,
            "solarized_dark" => IcedTheme::SolarizedDark,
            "gruvbox_light" => IcedTheme::GruvboxLight,
            "gruvbox_dark" => IcedTheme::GruvboxDark,
            "tokyo_night" => IcedTheme::TokyoNight,
            "tokyo_night_storm" => IcedTheme::TokyoNightStorm,
            "tokyo_night_light" => IcedTheme::TokyoNightLight,
            "kanagawa_wave" => IcedTheme::KanagawaWave,
            "kanagawa_dragon" => IcedTheme::KanagawaDragon,
            "kanagawa_lotus" => IcedTheme::KanagawaLotus,
            "floratrace" => Theme::default().0,
            _ => return Err(serde::de::Error::custom("Invalid theme")),
        };
        Ok(Theme(theme))
    }
}
