//! Render-mode decision for the result list.

use std::ops::Range;

/// Rows rendered beyond each edge of the viewport when windowing.
const OVERSCAN_ROWS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualizationPolicy {
    pub enabled: bool,
    /// Lists longer than this are windowed.
    pub threshold: usize,
    pub base_row_height: u32,
    /// Added per optional info line shown under a row.
    pub extra_field_height: u32,
    /// Maximum height of the list viewport.
    pub list_height: u32,
}

impl Default for VirtualizationPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 20,
            base_row_height: 60,
            extra_field_height: 20,
            list_height: 300,
        }
    }
}

impl VirtualizationPolicy {
    pub fn should_virtualize(&self, count: usize) -> bool {
        self.enabled && count > self.threshold
    }

    pub fn row_height(&self, extra_fields_shown: usize) -> u32 {
        let extra = u32::try_from(extra_fields_shown).unwrap_or(u32::MAX);
        self.base_row_height
            .saturating_add(self.extra_field_height.saturating_mul(extra))
    }

    /// Height of the list viewport: never taller than its content.
    pub fn visible_height(&self, count: usize, extra_fields_shown: usize) -> u32 {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        let content = count.saturating_mul(self.row_height(extra_fields_shown));
        content.min(self.list_height)
    }

    pub fn plan(&self, count: usize, extra_fields_shown: usize) -> RenderPlan {
        let mode = if self.should_virtualize(count) {
            RenderMode::Windowed
        } else {
            RenderMode::Full
        };

        RenderPlan {
            mode,
            count,
            row_height: self.row_height(extra_fields_shown),
            height: self.visible_height(count, extra_fields_shown),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Render every row.
    Full,
    /// Render only the rows inside the viewport.
    Windowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPlan {
    pub mode: RenderMode,
    pub count: usize,
    pub row_height: u32,
    /// Viewport height.
    pub height: u32,
}

impl RenderPlan {
    /// Rows to materialize for a viewport scrolled to `scroll_offset`.
    pub fn rows(&self, scroll_offset: u32) -> Range<usize> {
        if self.mode == RenderMode::Full || self.row_height == 0 {
            return 0..self.count;
        }

        let row = self.row_height as usize;
        let first = scroll_offset as usize / row;
        let visible = (self.height as usize).div_ceil(row);

        let start = first.saturating_sub(OVERSCAN_ROWS).min(self.count);
        let end = (first + visible + OVERSCAN_ROWS).min(self.count);
        start..end
    }

    /// Scroll offset that brings row `index` fully into view, given the
    /// current offset.
    pub fn scroll_to(&self, index: usize, scroll_offset: u32) -> u32 {
        let top = u32::try_from(index)
            .unwrap_or(u32::MAX)
            .saturating_mul(self.row_height);
        let bottom = top.saturating_add(self.row_height);

        if top < scroll_offset {
            top
        } else if bottom > scroll_offset.saturating_add(self.height) {
            bottom.saturating_sub(self.height)
        } else {
            scroll_offset
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_exclusive() {
        let policy = VirtualizationPolicy::default();
        assert!(!policy.should_virtualize(20));
        assert!(policy.should_virtualize(21));

        let disabled = VirtualizationPolicy {
            enabled: false,
            ..policy
        };
        assert!(!disabled.should_virtualize(500));
    }

    #[test]
    fn test_row_height_grows_per_field() {
        let policy = VirtualizationPolicy::default();
        assert_eq!(policy.row_height(0), 60);
        assert_eq!(policy.row_height(1), 80);
        assert_eq!(policy.row_height(2), 100);
    }

    #[test]
    fn test_visible_height_caps_at_list_height() {
        let policy = VirtualizationPolicy::default();
        assert_eq!(policy.visible_height(0, 0), 0);
        assert_eq!(policy.visible_height(3, 0), 180);
        assert_eq!(policy.visible_height(3, 1), 240);
        assert_eq!(policy.visible_height(50, 0), 300);
    }

    #[test]
    fn test_plan_modes() {
        let policy = VirtualizationPolicy::default();
        assert_eq!(policy.plan(5, 0).mode, RenderMode::Full);

        let plan = policy.plan(100, 0);
        assert_eq!(plan.mode, RenderMode::Windowed);
        assert_eq!(plan.height, 300);
        assert_eq!(plan.row_height, 60);
    }

    #[test]
    fn test_windowed_rows() {
        let plan = VirtualizationPolicy::default().plan(100, 0);
        assert_eq!(plan.rows(0), 0..7);
        // Scrolled to row 10: rows 8..17 (5 visible plus overscan).
        assert_eq!(plan.rows(600), 8..17);
        assert_eq!(plan.rows(60 * 99), 97..100);

        let full = VirtualizationPolicy::default().plan(4, 0);
        assert_eq!(full.rows(1_000), 0..4);
    }

    #[test]
    fn test_scroll_to_keeps_row_visible() {
        let plan = VirtualizationPolicy::default().plan(100, 0);
        assert_eq!(plan.scroll_to(2, 0), 0);
        assert_eq!(plan.scroll_to(5, 0), 60);
        assert_eq!(plan.scroll_to(3, 600), 180);
    }
}
