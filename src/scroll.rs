use super::window::VirtualWindow;

pub const DEFAULT_SCROLL_THRESHOLD: f64 = 0.995;
pub const DEFAULT_STAGE_STEP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPosition {
    pub offset: f64,
    pub viewport: f64,
    pub extent: f64,
    // < 0 при прокрутке вниз
    pub delta: f64,
}

impl ScrollPosition {
    // Пустой контент считаем прокрученным до конца
    pub fn ratio(&self) -> f64 {
        if self.extent <= 0.0 {
            return 1.0;
        }
        (self.offset + self.viewport) / self.extent
    }
}

// Догружает step элементов, когда список прокручен вниз почти до конца
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollStager {
    pub threshold: f64,
    pub step: usize,
}

impl ScrollStager {
    pub fn new(threshold: f64, step: usize) -> Self {
        Self { threshold, step }
    }

    #[inline]
    pub fn should_stage(&self, position: &ScrollPosition) -> bool {
        position.delta < 0.0 && position.ratio() >= self.threshold
    }

    pub fn on_scroll<T>(&self, position: &ScrollPosition, window: &VirtualWindow<T>) -> bool
    where
        T: Send + Sync + 'static,
    {
        self.should_stage(position) && window.stage(self.step)
    }
}

impl Default for ScrollStager {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLL_THRESHOLD, DEFAULT_STAGE_STEP)
    }
}
