//! 工廠預設資料：七種排料圖、三班制日曆、五台機台

use std::collections::BTreeMap;

use chrono::NaiveTime;

use crate::calendar::{ShiftCalendar, ShiftWindow};
use crate::catalog::GradeSpec;
use crate::resource::{Resource, ResourcePool};

const SIZES: [&str; 4] = ["P", "M", "G", "GG"];
const PIECE_WIDTHS: [f64; 4] = [0.2, 0.22, 0.23, 0.24];
const PIECE_LENGTHS: [f64; 4] = [0.7, 0.8, 0.9, 1.0];
const PIECE_PERIMETERS: [f64; 4] = [2.0, 2.2, 2.4, 2.8];

/// (ID, 各尺碼件數 P/M/G/GG, 利用率, 準備成本)
const GRADES: [(&str, [u32; 4], f64, f64); 7] = [
    ("Grade1", [1, 2, 3, 2], 0.88, 250.0),
    ("Grade2", [2, 1, 2, 1], 0.87, 300.0),
    ("Grade3", [0, 1, 1, 0], 0.85, 200.0),
    ("Grade4", [2, 0, 0, 1], 0.86, 180.0),
    ("Grade5", [1, 2, 1, 2], 0.86, 280.0),
    ("Grade6", [1, 1, 1, 1], 0.87, 220.0),
    ("Grade7", [0, 2, 2, 1], 0.88, 270.0),
];

fn by_size<T: Copy>(values: [T; 4]) -> BTreeMap<String, T> {
    SIZES.iter().map(|s| s.to_string()).zip(values).collect()
}

/// 標準排料圖（布幅 1.5 公尺）
pub fn standard_grades() -> Vec<GradeSpec> {
    let areas: [f64; 4] = std::array::from_fn(|i| PIECE_WIDTHS[i] * PIECE_LENGTHS[i]);

    GRADES
        .iter()
        .map(|&(id, quantities, utilization, setup_cost)| GradeSpec {
            id: id.to_string(),
            quantities: by_size(quantities),
            utilization,
            setup_cost,
            piece_widths: by_size(PIECE_WIDTHS),
            piece_areas: by_size(areas),
            piece_perimeters: by_size(PIECE_PERIMETERS),
            fabric_width: 1.5,
            fabric_cost: 18.90,
            cutting_cost: 0.45,
            laying_fixed_cost: 1.25,
            laying_variable_cost: 0.30,
            laying_hours_per_meter: 0.5,
            cutting_hours_per_meter: 0.01,
            max_layers: None,
        })
        .collect()
}

/// 三班制：早班 06–14（100%）、中班 14–22（90%）、夜班 22–06（80%）
pub fn three_shift_calendar() -> ShiftCalendar {
    let hour = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN);
    ShiftCalendar::from_validated(
        "THREE_SHIFT".to_string(),
        vec![
            ShiftWindow::new(hour(6), hour(14), 1.0),
            ShiftWindow::new(hour(14), hour(22), 0.9),
            ShiftWindow::new(hour(22), hour(6), 0.8),
        ],
    )
}

/// 標準機台：鋪布機 E1–E3、裁剪機 C1–C2
pub fn standard_resources() -> ResourcePool {
    ResourcePool::from_resources([
        Resource::laying("E1", 0.9),
        Resource::laying("E2", 0.93),
        Resource::laying("E3", 0.5),
        Resource::cutting("C1", 0.95),
        Resource::cutting("C2", 0.92),
    ])
}
