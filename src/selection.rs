use crate::error::{Result, ViewerError};

/// Thumbnail row state: which model the next placement uses and which
/// thumbnail carries the highlight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPicker {
    len: usize,
    selected: usize,
    highlighted: Option<usize>,
}

impl ModelPicker {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            selected: 0,
            highlighted: None,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index used by the next placement. Defaults to the first model.
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Highlighted thumbnail, `None` until the first click.
    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn is_highlighted(&self, index: usize) -> bool {
        self.highlighted == Some(index)
    }

    pub fn select(&mut self, index: usize) -> Result<()> {
        if index >= self.len {
            return Err(ViewerError::InvalidSelection {
                index,
                len: self.len,
            });
        }
        self.selected = index;
        self.highlighted = Some(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_highlighted_before_first_click() {
        let picker = ModelPicker::new(3);
        assert_eq!(picker.selected(), 0);
        assert_eq!(picker.highlighted(), None);
    }

    #[test]
    fn highlight_moves_to_latest_selection() {
        let mut picker = ModelPicker::new(4);
        picker.select(1).unwrap();
        picker.select(3).unwrap();
        let lit: Vec<usize> = (0..picker.len())
            .filter(|&i| picker.is_highlighted(i))
            .collect();
        assert_eq!(lit, vec![3]);
        assert_eq!(picker.selected(), 3);
    }

    #[test]
    fn out_of_range_selection_keeps_state() {
        let mut picker = ModelPicker::new(2);
        picker.select(1).unwrap();
        assert_eq!(
            picker.select(2),
            Err(ViewerError::InvalidSelection { index: 2, len: 2 })
        );
        assert_eq!(picker.selected(), 1);
        assert_eq!(picker.highlighted(), Some(1));
    }
}
