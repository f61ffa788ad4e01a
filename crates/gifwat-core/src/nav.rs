//! Keyboard navigation over the filtered grid.
//!
//! Selection is `None` or an index into the *filtered* sequence. Arrow keys
//! from `None` always land on the first card; from a card they move by one
//! (left/right) or by one row of `columns` (up/down), clamped to the grid.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Escape,
}

impl NavKey {
    pub fn is_arrow(self) -> bool {
        matches!(self, NavKey::Up | NavKey::Down | NavKey::Left | NavKey::Right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    /// Key not handled at this layer (modal open, or nothing to do)
    Ignored,
    /// Selection changed (or stayed put at an edge)
    Moved(Option<usize>),
    /// Activate the copy action on this filtered index
    Copy(usize),
    HideWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyOutcome {
    pub action: NavAction,
    /// Host should suppress its default handling (page scroll) for this key
    pub prevent_default: bool,
}

impl KeyOutcome {
    fn ignored() -> Self {
        Self {
            action: NavAction::Ignored,
            prevent_default: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyboardNavigator {
    columns: usize,
    selected: Option<usize>,
}

impl KeyboardNavigator {
    pub fn new(columns: usize) -> Self {
        Self {
            columns: columns.max(1),
            selected: None,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn reset(&mut self) {
        self.selected = None;
    }

    /// Re-clamp after the filtered sequence changed length.
    pub fn clamp(&mut self, len: usize) {
        self.selected = match self.selected {
            _ if len == 0 => None,
            Some(i) => Some(i.min(len - 1)),
            None => None,
        };
    }

    pub fn handle(&mut self, key: NavKey, len: usize, modal_open: bool) -> KeyOutcome {
        if modal_open {
            return KeyOutcome::ignored();
        }
        match key {
            NavKey::Escape => KeyOutcome {
                action: NavAction::HideWindow,
                prevent_default: false,
            },
            NavKey::Enter => match self.selected {
                Some(i) if i < len => KeyOutcome {
                    action: NavAction::Copy(i),
                    prevent_default: false,
                },
                _ => KeyOutcome::ignored(),
            },
            arrow => {
                self.selected = self.step(arrow, len);
                KeyOutcome {
                    action: NavAction::Moved(self.selected),
                    prevent_default: true,
                }
            }
        }
    }

    fn step(&self, key: NavKey, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let last = len - 1;
        let Some(i) = self.selected else {
            return Some(0);
        };
        let i = i.min(last);
        Some(match key {
            NavKey::Down => (i + self.columns).min(last),
            NavKey::Up => i.saturating_sub(self.columns),
            NavKey::Right => (i + 1).min(last),
            NavKey::Left => i.saturating_sub(1),
            NavKey::Enter | NavKey::Escape => i,
        })
    }
}
