//! Column tracking for the zone-based PRINT model.
//!
//! PRINT's comma separator advances to 14-column tab stops. The tracker
//! watches every byte the print sink emits: a newline resets the column,
//! anything else advances it by one. When the cursor is already at or past
//! the last zone boundary a comma wraps to a fresh line instead of padding.

/// Width of one print zone in columns.
pub const ZONE_WIDTH: usize = 14;

/// Column of the last zone boundary; a comma at or past it starts a new line.
pub const LAST_ZONE_BOUNDARY: usize = 70;

/// What a comma separator should emit, given the current column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommaAction {
    Newline,
    Spaces(usize),
}

/// Current output column, 0-based.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintLoc {
    column: usize,
}

impl PrintLoc {
    pub fn new() -> Self {
        PrintLoc::default()
    }

    pub fn column(&self) -> usize {
        self.column
    }

    /// Account for one emitted byte.
    pub fn observe(&mut self, byte: u8) {
        if byte == b'\n' {
            self.column = 0;
        } else {
            self.column += 1;
        }
    }

    pub fn observe_all(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.observe(b);
        }
    }

    /// Decide what the comma separator emits at the current column.
    pub fn comma_action(&self) -> CommaAction {
        if self.column >= LAST_ZONE_BOUNDARY {
            CommaAction::Newline
        } else {
            CommaAction::Spaces(ZONE_WIDTH - self.column % ZONE_WIDTH)
        }
    }
}
