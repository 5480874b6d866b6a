#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// `0.0..=1.0`
    pub a: f64,
}

impl Rgba {
    pub fn css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RenderCommand {
    Clear,
    Dot {
        x: f64,
        y: f64,
        radius: f64,
        color: Rgba,
    },
}

/// Draw list for one animation frame.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderFrame {
    pub index: u64,
    pub commands: Vec<RenderCommand>,
}

impl RenderFrame {
    pub fn dots(&self) -> impl Iterator<Item = &RenderCommand> {
        self.commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::Dot { .. }))
    }
}
