use eframe::egui::Color32;

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub name: String,
    pub background: Color32,
    pub foreground: Color32,
    pub heading_color: Color32,
    pub accent: Color32,
    pub muted: Color32,
    pub error: Color32,
    pub panel_background: Color32,
    pub joke_backdrop: Color32,
    pub camera_ring: Color32,
    pub title_size: f32,
    pub body_size: f32,
    pub notes_size: f32,
    pub status_size: f32,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: "dark".to_string(),
            background: Color32::from_rgb(0x11, 0x13, 0x1A),
            foreground: Color32::from_rgb(0xE8, 0xE8, 0xEE),
            heading_color: Color32::WHITE,
            accent: Color32::from_rgb(0x6A, 0xA5, 0xFF),
            muted: Color32::from_rgb(0x8A, 0x8F, 0xA3),
            error: Color32::from_rgb(0xE0, 0x5A, 0x5A),
            panel_background: Color32::from_rgb(0x1B, 0x1E, 0x28),
            joke_backdrop: Color32::from_rgba_unmultiplied(0, 0, 0, 0x99),
            camera_ring: Color32::from_rgb(0x6A, 0xA5, 0xFF),
            title_size: 64.0,
            body_size: 32.0,
            notes_size: 18.0,
            status_size: 14.0,
        }
    }

    pub fn light() -> Self {
        Self {
            name: "light".to_string(),
            background: Color32::from_rgb(0xFA, 0xFA, 0xFA),
            foreground: Color32::from_rgb(0x1C, 0x1D, 0x22),
            heading_color: Color32::from_rgb(0x16, 0x21, 0x3E),
            accent: Color32::from_rgb(0x2F, 0x6F, 0xE0),
            muted: Color32::from_rgb(0x6B, 0x6F, 0x80),
            error: Color32::from_rgb(0xB0, 0x2A, 0x2A),
            panel_background: Color32::from_rgb(0xEE, 0xEF, 0xF3),
            joke_backdrop: Color32::from_rgba_unmultiplied(0xFF, 0xFF, 0xFF, 0x99),
            camera_ring: Color32::from_rgb(0x2F, 0x6F, 0xE0),
            title_size: 64.0,
            body_size: 32.0,
            notes_size: 18.0,
            status_size: 14.0,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn is_dark(&self) -> bool {
        self.name == "dark"
    }

    /// Apply opacity to a color
    pub fn with_opacity(color: Color32, opacity: f32) -> Color32 {
        Color32::from_rgba_unmultiplied(
            color.r(),
            color.g(),
            color.b(),
            (opacity.clamp(0.0, 1.0) * 255.0) as u8,
        )
    }
}
