/// Edge styling handed to the rendering layer alongside each descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub line_color: String,
    pub selected_line_color: String,
    pub marker_color: String,
    pub stroke_width: f32,
    pub selected_stroke_width: f32,
    /// Corner radius of the smooth-step path.
    pub corner_radius: f32,
    pub badge_width: f32,
    pub badge_height: f32,
    pub badge_background: String,
    pub selected_badge_background: String,
    pub badge_text_color: String,
}

impl Theme {
    pub fn slate() -> Self {
        Self {
            line_color: "#94a3b8".to_string(),
            selected_line_color: "#3b82f6".to_string(),
            marker_color: "#94a3b8".to_string(),
            stroke_width: 3.0,
            selected_stroke_width: 5.0,
            corner_radius: 24.0,
            badge_width: 120.0,
            badge_height: 30.0,
            badge_background: "#1e293b".to_string(),
            selected_badge_background: "#2563eb".to_string(),
            badge_text_color: "#FFFFFF".to_string(),
        }
    }

    pub fn light() -> Self {
        Self {
            line_color: "#7A8AA6".to_string(),
            selected_line_color: "#2563eb".to_string(),
            marker_color: "#7A8AA6".to_string(),
            stroke_width: 2.0,
            selected_stroke_width: 4.0,
            corner_radius: 16.0,
            badge_width: 120.0,
            badge_height: 30.0,
            badge_background: "#F8FAFF".to_string(),
            selected_badge_background: "#DBEAFE".to_string(),
            badge_text_color: "#1C2430".to_string(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "slate" | "default" | "dark" => Some(Self::slate()),
            "light" => Some(Self::light()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::slate()
    }
}
