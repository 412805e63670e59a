//! 排程結果

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 單一訂單的機台排程
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub order_id: String,

    /// 鋪布機
    pub laying_resource_id: String,
    pub laying_start: NaiveDateTime,
    pub laying_finish: NaiveDateTime,

    /// 裁剪機
    pub cutting_resource_id: String,
    pub cutting_start: NaiveDateTime,
    pub cutting_finish: NaiveDateTime,
}

impl ScheduleEntry {
    /// 訂單完工時刻
    pub fn finish(&self) -> NaiveDateTime {
        self.cutting_finish
    }

    /// 鋪布完成到裁剪開始之間的等待（分鐘）
    pub fn queue_minutes(&self) -> i64 {
        (self.cutting_start - self.laying_finish).num_minutes()
    }

    /// 是否趕得上交期
    pub fn meets_deadline(&self, deadline: NaiveDateTime) -> bool {
        self.cutting_finish <= deadline
    }
}
