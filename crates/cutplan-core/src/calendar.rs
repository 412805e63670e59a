//! 班次日曆模型
//!
//! 一天由數個班次時段組成，每個時段有各自的效率係數。
//! 效率低於 1 時，同樣的有效工時需要更長的實際時間。

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::{CutPlanError, Result};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// 剩餘工時低於此值視為完成（小時）
const REMAINING_EPSILON_HOURS: f64 = 1e-9;

/// 班次時段
///
/// `start > end` 表示跨午夜的班次（例如 22:00–06:00），
/// `start == end` 表示涵蓋整天的班次。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftWindow {
    /// 開始時間（含）
    pub start: NaiveTime,
    /// 結束時間（不含）
    pub end: NaiveTime,
    /// 效率係數
    pub efficiency: f64,
}

impl ShiftWindow {
    /// 創建新的班次時段
    pub fn new(start: NaiveTime, end: NaiveTime, efficiency: f64) -> Self {
        Self {
            start,
            end,
            efficiency,
        }
    }

    /// 以整點小時創建班次時段
    pub fn from_hours(start_hour: u32, end_hour: u32, efficiency: f64) -> Result<Self> {
        let start = NaiveTime::from_hms_opt(start_hour, 0, 0).ok_or_else(|| {
            CutPlanError::Configuration(format!("無效的班次開始時間: {start_hour}"))
        })?;
        let end = NaiveTime::from_hms_opt(end_hour % 24, 0, 0)
            .ok_or_else(|| CutPlanError::Configuration(format!("無效的班次結束時間: {end_hour}")))?;
        Ok(Self::new(start, end, efficiency))
    }

    /// 是否跨越午夜
    pub fn wraps_midnight(&self) -> bool {
        self.start > self.end
    }

    /// 是否涵蓋整天
    pub fn is_full_day(&self) -> bool {
        self.start == self.end
    }

    /// 檢查某個時刻是否落在本班次內
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.is_full_day() {
            true
        } else if self.wraps_midnight() {
            time >= self.start || time < self.end
        } else {
            self.start <= time && time < self.end
        }
    }

    /// 班次長度（小時）
    pub fn length_hours(&self) -> f64 {
        self.seconds_until_end(self.start) / 3600.0
    }

    /// 從 `time` 到本班次結束的秒數，落在 (0, 86400]
    fn seconds_until_end(&self, time: NaiveTime) -> f64 {
        let remaining =
            (seconds_of_day(self.end) - seconds_of_day(time)).rem_euclid(SECONDS_PER_DAY);
        if remaining <= 0.0 {
            SECONDS_PER_DAY
        } else {
            remaining
        }
    }

    /// 當日秒數區段，跨午夜的班次拆成兩段
    fn segments(&self) -> Vec<(f64, f64)> {
        let start = seconds_of_day(self.start);
        let end = seconds_of_day(self.end);
        if self.is_full_day() {
            vec![(0.0, SECONDS_PER_DAY)]
        } else if self.wraps_midnight() {
            let mut segments = vec![(start, SECONDS_PER_DAY)];
            if end > 0.0 {
                segments.push((0.0, end));
            }
            segments
        } else {
            vec![(start, end)]
        }
    }
}

/// 班次日曆
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawShiftCalendar")]
pub struct ShiftCalendar {
    /// 日曆ID
    pub calendar_id: String,

    /// 班次（保持輸入順序）
    windows: Vec<ShiftWindow>,
}

#[derive(Deserialize)]
struct RawShiftCalendar {
    calendar_id: String,
    windows: Vec<ShiftWindow>,
}

impl TryFrom<RawShiftCalendar> for ShiftCalendar {
    type Error = CutPlanError;

    fn try_from(raw: RawShiftCalendar) -> Result<Self> {
        Self::new(raw.calendar_id, raw.windows)
    }
}

impl ShiftCalendar {
    /// 創建並驗證班次日曆
    ///
    /// 班次不可為空、不可重疊、效率必須為正數；整天班次只能單獨存在。
    /// 驗證失敗時回傳 `Configuration`，確保推算完工時間不會無限循環。
    pub fn new(calendar_id: String, windows: Vec<ShiftWindow>) -> Result<Self> {
        if windows.is_empty() {
            return Err(CutPlanError::Configuration(format!(
                "日曆 {calendar_id} 沒有任何班次"
            )));
        }

        for window in &windows {
            if !window.efficiency.is_finite() || window.efficiency <= 0.0 {
                return Err(CutPlanError::Configuration(format!(
                    "日曆 {calendar_id} 的班次 {}-{} 效率無效: {}",
                    window.start, window.end, window.efficiency
                )));
            }
            if window.is_full_day() && windows.len() > 1 {
                return Err(CutPlanError::Configuration(format!(
                    "日曆 {calendar_id} 的整天班次不能與其他班次並存"
                )));
            }
        }

        let mut segments: Vec<(f64, f64)> = windows.iter().flat_map(|w| w.segments()).collect();
        segments.sort_by(|a, b| a.0.total_cmp(&b.0));
        if let Some(pair) = segments.windows(2).find(|pair| pair[0].1 > pair[1].0) {
            return Err(CutPlanError::Configuration(format!(
                "日曆 {calendar_id} 的班次重疊: {:.0}s 至 {:.0}s",
                pair[1].0, pair[0].1
            )));
        }

        Ok(Self {
            calendar_id,
            windows,
        })
    }

    /// 內建班次（呼叫端保證合法）
    pub(crate) fn from_validated(calendar_id: String, windows: Vec<ShiftWindow>) -> Self {
        Self {
            calendar_id,
            windows,
        }
    }

    /// 創建 24 小時全效率日曆
    pub fn round_the_clock(calendar_id: String) -> Self {
        Self {
            calendar_id,
            windows: vec![ShiftWindow::new(NaiveTime::MIN, NaiveTime::MIN, 1.0)],
        }
    }

    /// 班次列表
    pub fn windows(&self) -> &[ShiftWindow] {
        &self.windows
    }

    /// 班次是否涵蓋整天（無空檔）
    pub fn covers_full_day(&self) -> bool {
        let covered: f64 = self
            .windows
            .iter()
            .flat_map(|w| w.segments())
            .map(|(start, end)| end - start)
            .sum();
        (covered - SECONDS_PER_DAY).abs() < 1e-6
    }

    /// 查找包含某時刻的班次（依輸入順序）
    pub fn find_window(&self, time: NaiveTime) -> Option<&ShiftWindow> {
        self.windows.iter().find(|w| w.contains(time))
    }

    /// 推算完工時間
    ///
    /// 從 `start` 開始投入 `duration_hours` 小時的有效工時，回傳實際完工時刻。
    /// 每個班次內實際耗時 = 有效工時 / 效率；遇到班次空檔時跳到下一個班次開始。
    ///
    /// # 範例
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use cutplan_core::presets;
    ///
    /// let calendar = presets::three_shift_calendar();
    /// let start = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap().and_hms_opt(13, 0, 0).unwrap();
    /// let finish = calendar.project_finish(start, 2.0).unwrap();
    /// assert_eq!(finish.format("%H:%M:%S").to_string(), "15:06:40");
    /// ```
    pub fn project_finish(
        &self,
        start: NaiveDateTime,
        duration_hours: f64,
    ) -> Result<NaiveDateTime> {
        if !duration_hours.is_finite() {
            return Err(CutPlanError::Configuration(format!(
                "無效的作業時長: {duration_hours}"
            )));
        }
        if duration_hours <= 0.0 {
            return Ok(start);
        }

        let mut current = start;
        let mut remaining = duration_hours;
        let mut consecutive_gaps = 0u8;

        while remaining > REMAINING_EPSILON_HOURS {
            let Some(window) = self.find_window(current.time()) else {
                consecutive_gaps += 1;
                if consecutive_gaps > 1 {
                    return Err(CutPlanError::Configuration(format!(
                        "日曆 {} 在 {} 找不到任何班次",
                        self.calendar_id, current
                    )));
                }
                current = self.next_opening(current);
                continue;
            };
            consecutive_gaps = 0;

            let available_secs = window.seconds_until_end(current.time());
            let needed_secs = remaining * 3600.0 / window.efficiency;

            if needed_secs <= available_secs {
                current += Duration::milliseconds((needed_secs * 1000.0).round() as i64);
                remaining = 0.0;
            } else {
                let window_end = next_occurrence(current, window.end);
                let elapsed_hours = (window_end - current).num_milliseconds() as f64 / 3_600_000.0;
                remaining -= elapsed_hours * window.efficiency;
                current = window_end;
            }
        }

        Ok(current)
    }

    /// 下一個班次開始的時刻
    fn next_opening(&self, from: NaiveDateTime) -> NaiveDateTime {
        self.windows
            .iter()
            .map(|w| next_occurrence(from, w.start))
            .min()
            .unwrap_or(from + Duration::days(1))
    }
}

/// `time` 在 `from` 之後（不含）的第一次出現
fn next_occurrence(from: NaiveDateTime, time: NaiveTime) -> NaiveDateTime {
    let candidate = from.date().and_time(time);
    if candidate > from {
        candidate
    } else {
        candidate + Duration::days(1)
    }
}

fn seconds_of_day(time: NaiveTime) -> f64 {
    time.num_seconds_from_midnight() as f64 + f64::from(time.nanosecond()) / 1e9
}
