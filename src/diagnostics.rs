//! Optional periodic diagnostics, switched on by the presence of
//! `ADV_DEBUG_LOGS` in the environment.

use crate::lighting::flashlight::Flashlight;
use crate::objects::field::LodCounts;

pub const DEBUG_ENV: &str = "ADV_DEBUG_LOGS";
pub const REPORT_INTERVAL: u64 = 60;

#[derive(Debug, Clone, Default)]
pub struct DebugLogs {
    enabled: bool,
    frame: u64,
}

impl DebugLogs {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, frame: 0 }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var_os(DEBUG_ENV).is_some())
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Count one frame; returns the report on every 60th.
    pub fn tick(&mut self, flashlight: &Flashlight, counts: &LodCounts) -> Option<String> {
        if !self.enabled {
            return None;
        }
        self.frame += 1;
        if self.frame % REPORT_INTERVAL != 0 {
            return None;
        }
        let report = format_report(self.frame, flashlight, counts);
        log::info!("{report}");
        Some(report)
    }
}

fn format_report(frame: u64, flashlight: &Flashlight, counts: &LodCounts) -> String {
    let [px, py, pz] = flashlight.position;
    let [dx, dy, dz] = flashlight.direction;
    format!(
        "frame {frame}: flashlight {} pos=({px:.2}, {py:.2}, {pz:.2}) dir=({dx:.2}, {dy:.2}, {dz:.2}) \
         cone=[{:.3}, {:.3}] brightness={:.2} | lod high={} medium={} low={} visible={} total={}",
        if flashlight.enabled { "on" } else { "off" },
        flashlight.inner_cutoff_cos,
        flashlight.outer_cutoff_cos,
        flashlight.brightness,
        counts.high,
        counts.medium,
        counts.low,
        counts.visible,
        counts.total,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_interval() {
        let mut logs = DebugLogs::new(true);
        let flashlight = Flashlight::default();
        let counts = LodCounts {
            high: 1,
            medium: 2,
            low: 3,
            visible: 6,
            total: 9,
        };
        let reports: Vec<_> = (0..120).filter_map(|_| logs.tick(&flashlight, &counts)).collect();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].contains("high=1 medium=2 low=3 visible=6 total=9"));
    }

    #[test]
    fn disabled_is_silent() {
        let mut logs = DebugLogs::new(false);
        for _ in 0..200 {
            assert!(logs.tick(&Flashlight::default(), &LodCounts::default()).is_none());
        }
    }
}
