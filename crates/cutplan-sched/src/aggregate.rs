//! 全域指標彙總

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use cutplan_core::{OptimizationResult, Order, ScheduleEntry};

/// 整批排產的彙總指標
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalKpis {
    pub orders_planned: usize,
    pub total_cost: f64,
    pub total_setup_cost: f64,
    pub total_overproduction_penalty: f64,
    pub total_laying_hours: f64,
    pub total_cutting_hours: f64,
    pub total_hours: f64,
    /// 平方公尺
    pub total_waste_area: f64,
    pub total_fabric_meters: f64,
    pub total_pieces: u64,
    pub total_layers: u64,
    /// 最後完工時刻
    pub plan_finish: Option<NaiveDateTime>,
    /// 從排產開始到最後完工（小時）
    pub makespan_hours: f64,
    /// 完工晚於交期的訂單
    pub late_orders: Vec<String>,
}

/// 彙總所有結果與排程
pub fn aggregate(
    results: &[OptimizationResult],
    schedule: &[ScheduleEntry],
    orders: &[Order],
    plan_start: NaiveDateTime,
) -> GlobalKpis {
    let mut kpis = GlobalKpis {
        orders_planned: results.len(),
        ..Default::default()
    };

    for result in results {
        kpis.total_cost += result.costs.total;
        kpis.total_setup_cost += result.costs.setup;
        kpis.total_overproduction_penalty += result.costs.overproduction_penalty;
        kpis.total_laying_hours += result.laying_hours;
        kpis.total_cutting_hours += result.cutting_hours;
        kpis.total_waste_area += result.waste_area;
        kpis.total_fabric_meters += result.fabric_meters;
        kpis.total_pieces += result.total_pieces();
        kpis.total_layers += result.layers.values().map(|&n| u64::from(n)).sum::<u64>();
    }
    kpis.total_hours = kpis.total_laying_hours + kpis.total_cutting_hours;

    kpis.plan_finish = schedule.iter().map(ScheduleEntry::finish).max();
    if let Some(finish) = kpis.plan_finish {
        kpis.makespan_hours = (finish - plan_start).num_seconds() as f64 / 3600.0;
    }

    let deadlines: HashMap<&str, NaiveDateTime> =
        orders.iter().map(|o| (o.id.as_str(), o.deadline)).collect();
    kpis.late_orders = schedule
        .iter()
        .filter(|entry| {
            deadlines
                .get(entry.order_id.as_str())
                .is_some_and(|&deadline| !entry.meets_deadline(deadline))
        })
        .map(|entry| entry.order_id.clone())
        .collect();

    kpis
}
