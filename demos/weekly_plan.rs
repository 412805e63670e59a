//! 一週裁剪排產示例
//!
//! 執行：`cargo run --example weekly_plan`，可用 `RUST_LOG=debug` 查看求解細節。

use anyhow::Context;
use chrono::NaiveDate;
use cutplan::{logging, presets, Order, PlanningConfig, PriorityCriterion, ProductionPlanner};

fn main() -> anyhow::Result<()> {
    logging::init();

    let start = NaiveDate::from_ymd_opt(2025, 3, 3)
        .and_then(|d| d.and_hms_opt(6, 0, 0))
        .context("無效的排產開始時間")?;
    let day = |offset: i64| start + chrono::Duration::days(offset);

    let config = PlanningConfig::new()
        .with_criterion(PriorityCriterion::Deadline)
        .with_overproduction(0.05, 10.0)
        .with_solver_time_limit_secs(60);

    let orders = vec![
        Order::new("PED-001".to_string(), day(2))
            .with_demand("P", 60)
            .with_demand("M", 100)
            .with_demand("G", 90)
            .with_demand("GG", 45),
        Order::new("PED-002".to_string(), day(1))
            .with_demand("M", 60)
            .with_demand("G", 60),
        Order::new("PED-003".to_string(), day(5))
            .with_demand("P", 80)
            .with_demand("GG", 40),
    ];

    let planner = ProductionPlanner::new(
        config,
        presets::three_shift_calendar(),
        presets::standard_resources(),
    )?;
    let plan = planner.plan(&orders, &presets::standard_grades(), start)?;

    println!("=== 排產結果 {} ===\n", plan.run_id);
    for entry in &plan.schedule {
        let result = plan.result(&entry.order_id).context("排程中的訂單沒有結果")?;
        println!(
            "{}: 排料圖 {:?}, 成本 {:.2}, 鋪布 {} {} → {}, 裁剪 {} {} → {}",
            entry.order_id,
            result.layers,
            result.costs.total,
            entry.laying_resource_id,
            entry.laying_start,
            entry.laying_finish,
            entry.cutting_resource_id,
            entry.cutting_start,
            entry.cutting_finish
        );
    }

    println!("\n總成本: {:.2}", plan.kpis.total_cost);
    println!("總工時: {:.2} h", plan.kpis.total_hours);
    println!("布料用量: {:.2} m", plan.kpis.total_fabric_meters);
    println!("完工跨度: {:.1} h", plan.kpis.makespan_hours);
    if !plan.kpis.late_orders.is_empty() {
        println!("逾期訂單: {:?}", plan.kpis.late_orders);
    }
    for warning in &plan.warnings {
        println!("[{:?}] {}: {}", warning.severity, warning.order_id, warning.message);
    }

    tracing::info!("輸出 JSON {} 位元組", serde_json::to_string(&plan)?.len());
    Ok(())
}
