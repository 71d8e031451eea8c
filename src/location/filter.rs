use crate::{config::LocationConfig, location::Fix, shared::Located};

/// Drops fixes that neither moved far enough nor arrived late enough.
///
/// A fix is let through when at least `min_interval` passed OR at least
/// `min_distance` was covered since the last fix that was let through.
#[derive(Debug, Clone)]
pub struct ThresholdFilter {
    config: LocationConfig,
    last: Option<Fix>,
}

impl ThresholdFilter {
    pub fn new(config: LocationConfig) -> Self {
        Self { config, last: None }
    }

    /// Seeds the filter with a fix that was already published.
    pub fn prime(&mut self, fix: Fix) {
        self.last = Some(fix);
    }

    pub fn accept(&mut self, fix: &Fix) -> bool {
        let pass = match &self.last {
            None => true,
            Some(last) => {
                let waited = (fix.timestamp - last.timestamp)
                    .to_std()
                    .map(|elapsed| elapsed >= self.config.min_interval)
                    .unwrap_or(false);
                waited || last.coordinate().distance(&fix.coordinate()) >= self.config.min_distance
            }
        };
        if pass {
            self.last = Some(fix.clone());
        }
        pass
    }
}
