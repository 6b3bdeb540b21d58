use crossterm::style::Color;

/// Color theme for the TUI
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    /// Background color
    pub bg: Color,
    /// Default text color
    pub fg: Color,
    /// Separator lines
    pub border: Color,
    /// Ciphertext letters (the row under each guess)
    pub cipher: Color,
    /// Committed guesses
    pub guess: Color,
    /// Guesses still waiting for the service
    pub pending: Color,
    /// Punctuation and digits
    pub fixed: Color,
    /// Placeholder under an unguessed letter
    pub blank: Color,
    /// Focused cell background
    pub selected_bg: Color,
    /// Other cells sharing the focused ciphertext letter
    pub highlight_bg: Color,
    /// Duplicate guesses and failures
    pub error: Color,
    /// Freshly autofilled cells and success messages
    pub success: Color,
    /// Info text color
    pub info: Color,
    /// Key binding text color
    pub key: Color,
}

impl Theme {
    /// Dark theme (default)
    pub fn dark() -> Self {
        Self {
            name: "dark",
            bg: Color::Rgb { r: 20, g: 22, b: 30 },
            fg: Color::Rgb { r: 230, g: 230, b: 240 },
            border: Color::Rgb { r: 70, g: 75, b: 90 },
            cipher: Color::Rgb { r: 140, g: 150, b: 180 },
            guess: Color::Rgb { r: 80, g: 180, b: 255 },
            pending: Color::Rgb { r: 255, g: 210, b: 100 },
            fixed: Color::Rgb { r: 255, g: 255, b: 255 },
            blank: Color::DarkGrey,
            selected_bg: Color::Rgb { r: 70, g: 90, b: 140 },
            highlight_bg: Color::Rgb { r: 35, g: 40, b: 55 },
            error: Color::Rgb { r: 255, g: 90, b: 90 },
            success: Color::Rgb { r: 90, g: 255, b: 130 },
            info: Color::Rgb { r: 160, g: 165, b: 185 },
            key: Color::Rgb { r: 255, g: 210, b: 100 },
        }
    }

    /// Light theme
    pub fn light() -> Self {
        Self {
            name: "light",
            bg: Color::Rgb { r: 248, g: 248, b: 252 },
            fg: Color::Rgb { r: 30, g: 30, b: 40 },
            border: Color::Rgb { r: 180, g: 180, b: 195 },
            cipher: Color::Rgb { r: 110, g: 110, b: 130 },
            guess: Color::Rgb { r: 30, g: 100, b: 200 },
            pending: Color::Rgb { r: 200, g: 120, b: 20 },
            fixed: Color::Rgb { r: 0, g: 0, b: 0 },
            blank: Color::Rgb { r: 190, g: 190, b: 200 },
            selected_bg: Color::Rgb { r: 180, g: 200, b: 255 },
            highlight_bg: Color::Rgb { r: 230, g: 232, b: 242 },
            error: Color::Rgb { r: 220, g: 50, b: 50 },
            success: Color::Rgb { r: 40, g: 160, b: 60 },
            info: Color::Rgb { r: 90, g: 90, b: 110 },
            key: Color::Rgb { r: 200, g: 120, b: 20 },
        }
    }

    /// High contrast theme
    pub fn high_contrast() -> Self {
        Self {
            name: "high-contrast",
            bg: Color::Black,
            fg: Color::White,
            border: Color::Grey,
            cipher: Color::Grey,
            guess: Color::Cyan,
            pending: Color::Yellow,
            fixed: Color::White,
            blank: Color::DarkGrey,
            selected_bg: Color::Blue,
            highlight_bg: Color::Rgb { r: 30, g: 30, b: 30 },
            error: Color::Red,
            success: Color::Green,
            info: Color::Grey,
            key: Color::Yellow,
        }
    }

    /// The theme after this one, wrapping around
    pub fn next(&self) -> Self {
        match self.name {
            "dark" => Self::light(),
            "light" => Self::high_contrast(),
            _ => Self::dark(),
        }
    }
}
