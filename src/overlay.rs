// src/overlay.rs
//
// Overlay drawing is a side-output: stages append `DrawCommand`s and a
// renderer (the OpenCV writer behind `video-opencv`) applies them. The
// detection result never depends on anything here.

use crate::types::{Rect, SignalColor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayColor {
    Red,
    Yellow,
    Green,
    White,
}

impl From<SignalColor> for OverlayColor {
    fn from(color: SignalColor) -> Self {
        match color {
            SignalColor::Red => OverlayColor::Red,
            SignalColor::Yellow => OverlayColor::Yellow,
            SignalColor::Green => OverlayColor::Green,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Line {
        from: (i32, i32),
        to: (i32, i32),
        color: OverlayColor,
        thickness: i32,
    },
    Rect {
        rect: Rect,
        color: OverlayColor,
        thickness: i32,
    },
    Caption {
        text: String,
        position: (i32, i32),
        color: OverlayColor,
    },
}

/// Status caption for the classified signal state.
pub fn signal_caption(color: SignalColor) -> DrawCommand {
    let (text, overlay) = match color {
        SignalColor::Red => ("Detected Signal Status: Stop", OverlayColor::Red),
        SignalColor::Yellow => ("Detected Signal Status: Caution", OverlayColor::Yellow),
        SignalColor::Green => ("Detected Signal Status: Go", OverlayColor::Green),
    };
    DrawCommand::Caption {
        text: text.to_string(),
        position: (15, 70),
        color: overlay,
    }
}

/// The accumulated fined-plate list, one caption per entry.
pub fn violation_list(plates: &[String]) -> Vec<DrawCommand> {
    let mut commands = Vec::with_capacity(plates.len() + 1);
    let mut y = 180;
    commands.push(DrawCommand::Caption {
        text: "Fined license plates:".to_string(),
        position: (25, y),
        color: OverlayColor::White,
    });
    y += 80;
    for plate in plates {
        commands.push(DrawCommand::Caption {
            text: format!("->  {}", plate),
            position: (40, y),
            color: OverlayColor::White,
        });
        y += 60;
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_list_layout() {
        let plates = vec!["AB 1234".to_string(), "CD 567".to_string()];
        let commands = violation_list(&plates);
        assert_eq!(commands.len(), 3);
        match &commands[2] {
            DrawCommand::Caption { text, position, .. } => {
                assert_eq!(text, "->  CD 567");
                assert_eq!(*position, (40, 320));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
